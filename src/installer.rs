//! Silent installation of a downloaded artifact.
//!
//! Windows artifacts are an Inno Setup installer run silently with a bounded
//! exit wait; Linux and macOS artifacts are archives extracted in-process.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use flate2::read::GzDecoder;
use log::{info, warn};
use tar::Archive;

use crate::clock::Clock;
use crate::error::SetupError;
use crate::paths::{InstallScope, PathSet};

/// How long to wait for the installer process before proceeding to
/// verification anyway. Some installers hand the real work to a detached
/// child and linger past completion.
const INSTALLER_WAIT: Duration = Duration::from_secs(300);
const INSTALLER_POLL: Duration = Duration::from_millis(500);

/// Inno Setup silent mode; scope flags are appended per run.
const SILENT_FLAGS: [&str; 3] = ["/VERYSILENT", "/SUPPRESSMSGBOXES", "/NORESTART"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOutcome {
    /// The installer was still running when the bounded wait expired.
    pub installer_detached: bool,
}

pub trait InstallRunner {
    /// Install the downloaded artifact into the path set's locations.
    fn install(
        &self,
        artifact: &Path,
        paths: &PathSet,
        scope: InstallScope,
    ) -> Result<InstallOutcome, SetupError>;

    /// Run the platform's official uninstaller silently and return its exit
    /// code. A non-zero code is reported by the caller, not fatal.
    fn run_uninstaller(&self, uninstaller: &Path) -> anyhow::Result<i32>;
}

/// Runner executing against the real host.
pub struct HostRunner<'a> {
    clock: &'a dyn Clock,
}

impl<'a> HostRunner<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    fn run_silent_installer(
        &self,
        artifact: &Path,
        scope: InstallScope,
    ) -> Result<InstallOutcome, SetupError> {
        let scope_flag = match scope {
            InstallScope::CurrentUser => "/CURRENTUSER",
            InstallScope::AllUsers => "/ALLUSERS",
        };
        let mut child = Command::new(artifact)
            .args(SILENT_FLAGS)
            .arg(scope_flag)
            .spawn()
            .map_err(|e| SetupError::InstallerLaunch(e.to_string()))?;

        let deadline = self.clock.now() + INSTALLER_WAIT;
        loop {
            match child.try_wait().map_err(|e| SetupError::InstallerLaunch(e.to_string()))? {
                Some(status) if status.success() => {
                    return Ok(InstallOutcome { installer_detached: false });
                }
                Some(status) => {
                    return Err(SetupError::InstallerNonZeroExit(status.code().unwrap_or(-1)));
                }
                None if self.clock.now() >= deadline => {
                    warn!(
                        "installer still running after {}s, verifying anyway",
                        INSTALLER_WAIT.as_secs()
                    );
                    return Ok(InstallOutcome { installer_detached: true });
                }
                None => self.clock.sleep(INSTALLER_POLL),
            }
        }
    }
}

impl InstallRunner for HostRunner<'_> {
    fn install(
        &self,
        artifact: &Path,
        paths: &PathSet,
        scope: InstallScope,
    ) -> Result<InstallOutcome, SetupError> {
        let name = artifact.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".exe") {
            info!("running silent installer {name}");
            self.run_silent_installer(artifact, scope)
        } else {
            info!("extracting {name}");
            if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
                extract_tar_gz(artifact, paths)?;
            } else if name.ends_with(".zip") {
                extract_zip(artifact, paths)?;
            } else {
                return Err(SetupError::InstallerLaunch(format!(
                    "unrecognized artifact format: {name}"
                )));
            }
            Ok(InstallOutcome { installer_detached: false })
        }
    }

    fn run_uninstaller(&self, uninstaller: &Path) -> anyhow::Result<i32> {
        let output = Command::new(uninstaller).args(SILENT_FLAGS).output()?;
        Ok(output.status.code().unwrap_or(-1))
    }
}

/// Pull the agent binary out of a release tarball into the install dir.
fn extract_tar_gz(artifact: &Path, paths: &PathSet) -> Result<(), SetupError> {
    let tar_gz = File::open(artifact)?;
    let mut archive = Archive::new(GzDecoder::new(tar_gz));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?;
        if entry_path.file_name().and_then(|n| n.to_str()) == Some(paths.binary_name)
            && entry.header().entry_type().is_file()
        {
            fs::create_dir_all(&paths.install_dir)?;
            let target = paths.binary_path();
            entry.unpack(&target)?;
            mark_executable(&target)?;
            return Ok(());
        }
    }

    Err(archive_missing_binary(paths))
}

/// Same as [`extract_tar_gz`] for zip releases (macOS).
fn extract_zip(artifact: &Path, paths: &PathSet) -> Result<(), SetupError> {
    let file = File::open(artifact)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| SetupError::InstallerLaunch(format!("unreadable zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SetupError::InstallerLaunch(format!("unreadable zip entry: {e}")))?;
        let is_binary = Path::new(entry.name())
            .file_name()
            .and_then(|n| n.to_str())
            == Some(paths.binary_name);
        if is_binary && !entry.is_dir() {
            fs::create_dir_all(&paths.install_dir)?;
            let target = paths.binary_path();
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            mark_executable(&target)?;
            return Ok(());
        }
    }

    Err(archive_missing_binary(paths))
}

fn archive_missing_binary(paths: &PathSet) -> SetupError {
    SetupError::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("artifact does not contain {}", paths.binary_name),
    ))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
