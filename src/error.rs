//! Error taxonomy for setup operations.
//!
//! Fatal conditions abort the current operation and map to a non-zero exit.
//! Non-fatal conditions are collected as [`Warning`]s and surfaced in the
//! final report without interrupting the remaining steps.

use std::fmt;

use thiserror::Error;

/// Fatal setup failures.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unsupported platform: {os}-{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Release index unreachable or returned a malformed document.
    #[error("failed to resolve release version: {0}")]
    VersionResolution(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("failed to launch installer: {0}")]
    InstallerLaunch(String),

    /// The installer process exited on its own with a failure status.
    #[error("installer exited with code {0}")]
    InstallerNonZeroExit(i32),

    /// The agent binary never materialized after an install attempt.
    #[error("installation failed: agent binary missing after install")]
    InstallationFailed,

    /// No installation marker of any kind was found.
    #[error("nothing to uninstall")]
    NothingToUninstall,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions accumulated during a run and printed with the final
/// report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Binary is usable but one or more secondary markers are missing.
    PartialInstall { missing: Vec<&'static str> },
    /// The installer process outlived the bounded wait. Some installers hand
    /// off to a detached child after the real work is done, so verification
    /// proceeds anyway.
    InstallerStillRunning,
    AutostartConfiguration(String),
    RemoteBindConfiguration(String),
    /// The official uninstaller failed; manual cleanup is the fallback.
    UninstallerFailed { code: Option<i32> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PartialInstall { missing } => {
                write!(f, "installation incomplete: missing {}", missing.join(", "))
            }
            Warning::InstallerStillRunning => {
                write!(f, "installer still running after the bounded wait; verified anyway")
            }
            Warning::AutostartConfiguration(msg) => {
                write!(f, "autostart configuration failed: {msg}")
            }
            Warning::RemoteBindConfiguration(msg) => {
                write!(f, "remote access not configured: {msg}")
            }
            Warning::UninstallerFailed { code: Some(code) } => {
                write!(f, "official uninstaller exited with code {code}; manual cleanup performed")
            }
            Warning::UninstallerFailed { code: None } => {
                write!(f, "official uninstaller could not be run; manual cleanup performed")
            }
        }
    }
}
