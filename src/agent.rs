//! Syncthing binary command surface and host process control.
//!
//! Everything here is a best-effort probe or control action against an
//! external binary: a missing or unexecutable agent is an expected state the
//! inspector reports, not an error.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use log::{debug, warn};

use crate::clock::{Clock, wait_for};

const STOP_POLL: Duration = Duration::from_millis(250);

/// Control surface over the agent binary and its host process.
pub trait AgentControl {
    /// Whether an agent process is currently present in the process table.
    fn is_running(&self) -> bool;

    /// Version reported by the binary itself, e.g. `v1.27.12`. `None` when
    /// the binary cannot be executed or its output is unrecognized.
    fn version(&self, binary: &Path) -> Option<String>;

    /// Local device identifier, when the agent has generated its keys.
    fn device_id(&self, binary: &Path) -> Option<String>;

    /// Stop any running agent process: graceful terminate, bounded grace
    /// period, then force-terminate. Best-effort.
    fn stop(&self, grace: Duration);

    /// Current GUI/control bind address, e.g. `127.0.0.1:8384`.
    fn gui_address(&self, binary: &Path) -> Option<String>;

    fn set_gui_address(&self, binary: &Path, addr: &str) -> bool;

    /// Ask a running agent to restart itself.
    fn restart(&self, binary: &Path) -> bool;
}

/// Real implementation driving the `syncthing` binary and the OS process
/// table.
pub struct SyncthingControl<'a> {
    clock: &'a dyn Clock,
}

impl<'a> SyncthingControl<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Run a `syncthing cli ...` subcommand, returning trimmed stdout.
    fn cli(&self, binary: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new(binary).arg("cli").args(args).output().ok()?;
        if !output.status.success() {
            debug!(
                "syncthing cli {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl AgentControl for SyncthingControl<'_> {
    fn is_running(&self) -> bool {
        process_running()
    }

    fn version(&self, binary: &Path) -> Option<String> {
        let output = Command::new(binary).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_version(&String::from_utf8_lossy(&output.stdout))
    }

    fn device_id(&self, binary: &Path) -> Option<String> {
        // 2.0+ uses a subcommand, older releases a flag.
        for args in [["device-id"], ["--device-id"]] {
            if let Ok(output) = Command::new(binary).args(args).output()
                && output.status.success()
            {
                let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !id.is_empty() {
                    return Some(id);
                }
            }
        }
        None
    }

    fn stop(&self, grace: Duration) {
        terminate_process(false);
        if wait_for(self.clock, grace, STOP_POLL, || !process_running()) {
            return;
        }
        warn!("agent did not stop within {}s, force-terminating", grace.as_secs());
        terminate_process(true);
        wait_for(self.clock, grace, STOP_POLL, || !process_running());
    }

    fn gui_address(&self, binary: &Path) -> Option<String> {
        self.cli(binary, &["config", "gui", "raw-address", "get"])
    }

    fn set_gui_address(&self, binary: &Path, addr: &str) -> bool {
        self.cli(binary, &["config", "gui", "raw-address", "set", addr])
            .is_some()
    }

    fn restart(&self, binary: &Path) -> bool {
        self.cli(binary, &["operations", "restart"]).is_some()
    }
}

/// Parse the first line of `syncthing --version` output, e.g.
/// `syncthing v1.27.12 "Gold Grasshopper" (go1.22.3 ...)`.
fn parse_version(stdout: &str) -> Option<String> {
    let token = stdout.split_whitespace().nth(1)?;
    token.starts_with('v').then(|| token.to_string())
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn process_running() -> bool {
            Command::new("tasklist")
                .args(["/FI", "IMAGENAME eq syncthing.exe", "/NH"])
                .output()
                .map(|o| String::from_utf8_lossy(&o.stdout).contains("syncthing.exe"))
                .unwrap_or(false)
        }

        fn terminate_process(force: bool) {
            let mut cmd = Command::new("taskkill");
            if force {
                cmd.arg("/F");
            }
            let _ = cmd.args(["/IM", "syncthing.exe"]).output();
        }
    } else {
        fn process_running() -> bool {
            Command::new("pgrep")
                .args(["-x", "syncthing"])
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        }

        fn terminate_process(force: bool) {
            let signal = if force { "-KILL" } else { "-TERM" };
            let _ = Command::new("pkill").args([signal, "-x", "syncthing"]).output();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_parses() {
        let line = "syncthing v1.27.12 \"Gold Grasshopper\" (go1.22.3 linux-amd64)";
        assert_eq!(parse_version(line), Some("v1.27.12".to_string()));
    }

    #[test]
    fn garbage_version_output_is_rejected() {
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("syncthing"), None);
        assert_eq!(parse_version("error: cannot load config"), None);
    }
}
