//! Scope-dependent filesystem layout.
//!
//! A [`PathSet`] is a pure function of (os, scope), derived once per run and
//! never mutated afterwards. Entries with no counterpart on a platform
//! (uninstaller, shortcuts outside Windows) are `None`; the inspector treats
//! those markers as satisfied.

use std::path::PathBuf;

use crate::error::SetupError;
use crate::platform::Os;

/// Installation scope, chosen at invocation and immutable for the run.
///
/// `AllUsers` targets machine-wide locations and generally requires elevated
/// privileges; `CurrentUser` stays inside the invoking user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallScope {
    CurrentUser,
    AllUsers,
}

#[derive(Debug, Clone)]
pub struct PathSet {
    /// Dedicated directory holding the agent binary. Owned entirely by this
    /// tool (or the official installer), so partial-state teardown may remove
    /// it wholesale.
    pub install_dir: PathBuf,
    /// The agent's own configuration/data directory. Only ever removed on an
    /// explicit purge request.
    pub config_dir: PathBuf,
    /// Start Menu program group (Windows only).
    pub shortcut_dir: Option<PathBuf>,
    /// Official uninstaller inside the install dir (Windows only).
    pub uninstaller_path: Option<PathBuf>,
    pub binary_name: &'static str,
}

impl PathSet {
    pub fn resolve(os: Os, scope: InstallScope) -> Result<Self, SetupError> {
        match os {
            Os::Linux => {
                let home = home_dir()?;
                Ok(Self {
                    install_dir: match scope {
                        InstallScope::CurrentUser => home.join(".local/opt/syncthing"),
                        InstallScope::AllUsers => PathBuf::from("/opt/syncthing"),
                    },
                    config_dir: home.join(".local/state/syncthing"),
                    shortcut_dir: None,
                    uninstaller_path: None,
                    binary_name: "syncthing",
                })
            }
            Os::MacOs => {
                let home = home_dir()?;
                Ok(Self {
                    install_dir: match scope {
                        InstallScope::CurrentUser => home.join(".local/opt/syncthing"),
                        InstallScope::AllUsers => PathBuf::from("/opt/syncthing"),
                    },
                    config_dir: home.join("Library/Application Support/Syncthing"),
                    shortcut_dir: None,
                    uninstaller_path: None,
                    binary_name: "syncthing",
                })
            }
            Os::Windows => {
                let install_dir = match scope {
                    InstallScope::CurrentUser => local_data_dir()?.join("Programs").join("Syncthing"),
                    InstallScope::AllUsers => std::env::var("ProgramFiles")
                        .map(PathBuf::from)
                        .unwrap_or_else(|_| PathBuf::from(r"C:\Program Files"))
                        .join("Syncthing"),
                };
                let shortcut_dir = match scope {
                    InstallScope::CurrentUser => roaming_dir()?
                        .join(r"Microsoft\Windows\Start Menu\Programs\Syncthing"),
                    InstallScope::AllUsers => std::env::var("ProgramData")
                        .map(PathBuf::from)
                        .unwrap_or_else(|_| PathBuf::from(r"C:\ProgramData"))
                        .join(r"Microsoft\Windows\Start Menu\Programs\Syncthing"),
                };
                Ok(Self {
                    config_dir: local_data_dir()?.join("Syncthing"),
                    uninstaller_path: Some(install_dir.join("unins000.exe")),
                    install_dir,
                    shortcut_dir: Some(shortcut_dir),
                    binary_name: "syncthing.exe",
                })
            }
        }
    }

    /// Expected location of the agent binary.
    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(self.binary_name)
    }
}

fn home_dir() -> Result<PathBuf, SetupError> {
    dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not resolvable").into()
    })
}

fn local_data_dir() -> Result<PathBuf, SetupError> {
    dirs::data_local_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "local data directory not resolvable")
            .into()
    })
}

fn roaming_dir() -> Result<PathBuf, SetupError> {
    dirs::config_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "profile directory not resolvable")
            .into()
    })
}
