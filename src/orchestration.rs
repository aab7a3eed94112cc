//! Install orchestration.
//!
//! Sequences inspect -> fetch -> install -> verify -> report, reconciling
//! whatever prior state the inspector finds. A partial install is never
//! completed in place: it may be the combined residue of two different
//! installer mechanisms, so it is torn down and redone from scratch.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::agent::AgentControl;
use crate::autostart::{Autostart, ServiceSpec};
use crate::clock::{Clock, wait_for};
use crate::detection::{InstallationState, inspect};
use crate::error::{SetupError, Warning};
use crate::fetch::{ArtifactSource, DesiredVersion};
use crate::installer::InstallRunner;
use crate::paths::{InstallScope, PathSet};
use crate::platform::{Os, PlatformId};

/// Grace period before a running agent is force-terminated.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// Ceiling for the agent configuration file to appear after first start.
const CONFIG_WAIT: Duration = Duration::from_secs(60);
const CONFIG_POLL: Duration = Duration::from_secs(1);

/// Collaborators for one run, wired up once at process entry.
pub struct Deps<'a> {
    pub platform: PlatformId,
    pub paths: &'a PathSet,
    pub source: &'a dyn ArtifactSource,
    pub runner: &'a dyn InstallRunner,
    pub autostart: &'a dyn Autostart,
    pub agent: &'a dyn AgentControl,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub scope: InstallScope,
    pub version: DesiredVersion,
    pub skip_service: bool,
}

#[derive(Debug)]
pub struct InstallReport {
    pub state: InstallationState,
    pub version: Option<String>,
    /// The target was already complete; nothing was fetched or changed.
    pub already_installed: bool,
    pub warnings: Vec<Warning>,
}

/// Run the install state machine to completion.
///
/// Fatal errors abort immediately; the scoped download directory is removed
/// on every exit path. Non-fatal conditions accumulate in the report.
pub fn run_install(deps: &Deps, opts: &InstallOptions) -> Result<InstallReport, SetupError> {
    let mut warnings = Vec::new();

    let state = inspect(deps.paths, deps.autostart, deps.agent);

    // Already complete: report the existing version, touch nothing, no
    // network traffic.
    if state.is_complete() {
        info!(
            "already installed: {}",
            state.version.as_deref().unwrap_or("unknown")
        );
        return Ok(InstallReport {
            version: state.version.clone(),
            state,
            already_installed: true,
            warnings,
        });
    }

    if state.has_binary {
        teardown_partial(deps, &state)?;
    }

    // Fetching. The staging guard removes the per-run temp directory on
    // every exit path below, including the error returns.
    let version = deps.source.resolve(&opts.version)?;
    let staging = tempfile::Builder::new()
        .prefix("scratch-sync-setup-")
        .tempdir()?;
    let artifact = deps
        .source
        .download(deps.platform, &version, staging.path())?;

    // Installing.
    let outcome = deps.runner.install(&artifact, deps.paths, opts.scope)?;
    if outcome.installer_detached {
        warnings.push(Warning::InstallerStillRunning);
    }

    // Verifying.
    let state = inspect(deps.paths, deps.autostart, deps.agent);
    if !state.has_binary {
        return Err(SetupError::InstallationFailed);
    }
    if !state.is_complete() {
        warnings.push(Warning::PartialInstall { missing: state.missing_markers() });
    }

    if opts.skip_service {
        info!("autostart registration skipped on request");
    } else {
        register_autostart(deps, &mut warnings);
    }

    configure_remote_access(deps, &state, &mut warnings);

    Ok(InstallReport {
        version: state.version.clone().or(Some(version)),
        state,
        already_installed: false,
        warnings,
    })
}

/// Remove the remnants of a partial install so the fetch starts from a clean
/// slate.
fn teardown_partial(deps: &Deps, state: &InstallationState) -> Result<(), SetupError> {
    warn!(
        "partial installation detected (missing {}), removing before reinstall",
        state.missing_markers().join(", ")
    );
    if state.is_running {
        deps.agent.stop(STOP_GRACE);
    }
    remove_dir_if_present(&deps.paths.install_dir)?;
    if let Some(dir) = &deps.paths.shortcut_dir {
        remove_dir_if_present(dir)?;
    }
    Ok(())
}

fn register_autostart(deps: &Deps, warnings: &mut Vec<Warning>) {
    let mut args = vec![
        "serve".to_string(),
        "--no-browser".to_string(),
        "--no-restart".to_string(),
    ];
    if deps.platform.os == Os::Windows {
        args.push("--no-console".to_string());
    }
    let spec = ServiceSpec {
        name: deps.autostart.logical_name().to_string(),
        executable: deps.paths.binary_path(),
        args,
    };
    match deps.autostart.register(&spec) {
        Ok(outcome) => info!(
            "autostart entry {:?} via {} ({:?})",
            spec.name,
            deps.autostart.mechanism(),
            outcome
        ),
        Err(e) => warnings.push(Warning::AutostartConfiguration(format!("{e:#}"))),
    }
}

/// Open the agent's bind address to the private network once its config
/// exists. Local operation is unaffected if any of this fails, so every
/// failure path is a warning.
fn configure_remote_access(
    deps: &Deps,
    state: &InstallationState,
    warnings: &mut Vec<Warning>,
) {
    let config_file = deps.paths.config_dir.join("config.xml");
    let appeared = wait_for(deps.clock, CONFIG_WAIT, CONFIG_POLL, || config_file.is_file());
    if !appeared {
        warnings.push(Warning::RemoteBindConfiguration(
            "agent configuration did not appear within the wait ceiling".to_string(),
        ));
        return;
    }

    let binary = deps.paths.binary_path();
    let Some(addr) = deps.agent.gui_address(&binary) else {
        warnings.push(Warning::RemoteBindConfiguration(
            "could not read the agent bind address".to_string(),
        ));
        return;
    };

    let Some(rewritten) = rewrite_loopback(&addr) else {
        info!("bind address {addr} already reachable remotely");
        return;
    };

    if !deps.agent.set_gui_address(&binary, &rewritten) {
        warnings.push(Warning::RemoteBindConfiguration(format!(
            "could not rewrite bind address {addr}"
        )));
        return;
    }
    info!("bind address changed from {addr} to {rewritten}");

    if state.is_running && !deps.agent.restart(&binary) {
        warnings.push(Warning::RemoteBindConfiguration(
            "bind address updated but the agent restart failed".to_string(),
        ));
    }
}

/// Rewrite a loopback-bound listen address to all interfaces, keeping the
/// port. Non-loopback addresses are left alone.
fn rewrite_loopback(addr: &str) -> Option<String> {
    let (host, port) = addr.rsplit_once(':')?;
    matches!(host, "127.0.0.1" | "localhost" | "[::1]").then(|| format!("0.0.0.0:{port}"))
}

pub(crate) fn remove_dir_if_present(dir: &Path) -> Result<(), SetupError> {
    if dir.exists() {
        info!("removing {}", dir.display());
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}
