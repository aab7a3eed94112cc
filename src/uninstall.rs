//! Uninstallation: reverses the orchestrator and registrar effects.
//!
//! Fixed order: stop the agent, unregister autostart, run the official
//! uninstaller when one exists, otherwise clean up manually. Configuration
//! data survives unless explicitly purged.

use std::path::PathBuf;

use log::info;

use crate::autostart::UnregisterOutcome;
use crate::detection::{inspect, markers_present};
use crate::error::{SetupError, Warning};
use crate::orchestration::{Deps, STOP_GRACE, remove_dir_if_present};

#[derive(Debug)]
pub struct UninstallReport {
    pub warnings: Vec<Warning>,
    /// Where the untouched configuration lives, when it was preserved.
    pub config_preserved: Option<PathBuf>,
}

/// Remove the agent installation.
///
/// Returns [`SetupError::NothingToUninstall`] when no installation marker
/// exists at all; callers wanting idempotent ensure-absent semantics treat
/// that as success.
pub fn run_uninstall(deps: &Deps, purge_config: bool) -> Result<UninstallReport, SetupError> {
    let state = inspect(deps.paths, deps.autostart, deps.agent);
    if !markers_present(deps.paths, &state) {
        return Err(SetupError::NothingToUninstall);
    }

    let mut warnings = Vec::new();

    if state.is_running {
        info!("stopping the running agent");
        deps.agent.stop(STOP_GRACE);
    }

    match deps.autostart.unregister(deps.autostart.logical_name()) {
        Ok(UnregisterOutcome::Removed) => info!("autostart entry removed"),
        Ok(UnregisterOutcome::NotFound) => {}
        Err(e) => warnings.push(Warning::AutostartConfiguration(format!("{e:#}"))),
    }

    // Prefer the official uninstaller; it knows about every file its
    // installer laid down.
    let mut uninstaller_succeeded = false;
    if let Some(uninstaller) = deps.paths.uninstaller_path.as_ref().filter(|p| p.is_file()) {
        info!("running official uninstaller {}", uninstaller.display());
        match deps.runner.run_uninstaller(uninstaller) {
            Ok(0) => uninstaller_succeeded = true,
            Ok(code) => warnings.push(Warning::UninstallerFailed { code: Some(code) }),
            Err(e) => {
                info!("uninstaller launch failed: {e:#}");
                warnings.push(Warning::UninstallerFailed { code: None });
            }
        }
    }

    if !uninstaller_succeeded {
        remove_dir_if_present(&deps.paths.install_dir)?;
        if let Some(dir) = &deps.paths.shortcut_dir {
            remove_dir_if_present(dir)?;
        }
        // Sweep any residual entry a foreign installer may have left under
        // the same logical name.
        let _ = deps.autostart.unregister(deps.autostart.logical_name());
    }

    if purge_config {
        remove_dir_if_present(&deps.paths.config_dir)?;
        info!("configuration data purged");
        return Ok(UninstallReport { warnings, config_preserved: None });
    }

    let config_preserved = deps.paths.config_dir.exists().then(|| deps.paths.config_dir.clone());
    Ok(UninstallReport { warnings, config_preserved })
}
