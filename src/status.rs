//! Read-only status report.
//!
//! Runs the inspector plus companion-tool probes and prints a fixed report.
//! Nothing here can fail the process; `status` always exits 0.

use std::path::PathBuf;
use std::process::Command;

use crate::detection::{InstallationState, inspect};
use crate::orchestration::Deps;

pub fn run_status(deps: &Deps) {
    let state = inspect(deps.paths, deps.autostart, deps.agent);

    println!("scratch-sync agent status");
    println!();
    println!("  syncthing:   {}", summarize(&state));
    if state.has_binary {
        println!("    binary:    {}", deps.paths.binary_path().display());
        if let Some(id) = deps.agent.device_id(&deps.paths.binary_path()) {
            println!("    device id: {id}");
        }
    } else if let Ok(found) = which::which("syncthing") {
        // A foreign install outside the managed directory is worth surfacing.
        println!("    found on PATH at {} (not managed by this tool)", found.display());
    }
    println!("    running:   {}", if state.is_running { "yes" } else { "no" });
    println!(
        "    autostart: {}",
        if state.has_autostart {
            format!("registered ({})", deps.autostart.mechanism())
        } else {
            "not registered".to_string()
        }
    );
    println!("    config:    {}", deps.paths.config_dir.display());
    println!();
    println!("  companions:");
    match probe_tailscale() {
        Some((path, Some(version))) => {
            println!("    tailscale: {version} ({})", path.display());
        }
        Some((path, None)) => println!("    tailscale: present ({})", path.display()),
        None => println!("    tailscale: not found"),
    }
}

fn summarize(state: &InstallationState) -> String {
    if !state.has_binary {
        return "not installed".to_string();
    }
    let version = state.version.as_deref().unwrap_or("unknown").to_string();
    if state.is_complete() {
        format!("installed ({version})")
    } else {
        format!("partial ({version}; missing {})", state.missing_markers().join(", "))
    }
}

/// Locate the Tailscale companion and its version, best-effort.
fn probe_tailscale() -> Option<(PathBuf, Option<String>)> {
    let path = which::which("tailscale").ok()?;
    let version = Command::new(&path)
        .arg("version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            // First line is the bare version, the rest is commit metadata.
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
        })
        .filter(|v| !v.is_empty());
    Some((path, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(has_binary: bool, complete: bool, version: Option<&str>) -> InstallationState {
        InstallationState {
            has_binary,
            has_uninstaller: complete,
            has_shortcuts: complete,
            has_autostart: false,
            version: version.map(String::from),
            is_running: false,
        }
    }

    #[test]
    fn summary_covers_the_three_states() {
        assert_eq!(summarize(&state(false, false, None)), "not installed");
        assert_eq!(summarize(&state(true, true, Some("v1.27.12"))), "installed (v1.27.12)");
        assert_eq!(
            summarize(&state(true, false, None)),
            "partial (unknown; missing uninstaller, shortcuts)"
        );
    }
}
