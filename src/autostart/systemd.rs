//! systemd user-unit registration (Linux).
//!
//! Writes `~/.config/systemd/user/<name>.service` and enables it for the
//! user session. `enable --now` also starts the agent immediately so the
//! first run can finish its configuration.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::debug;

use super::{Autostart, RegisterOutcome, ServiceSpec, UnregisterOutcome};

const UNIT_NAME: &str = "syncthing";

pub struct SystemdUser;

impl SystemdUser {
    pub fn new() -> Self {
        Self
    }

    fn unit_path(&self, name: &str) -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("config directory not resolvable")?
            .join("systemd/user")
            .join(format!("{name}.service")))
    }

    fn systemctl(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new("systemctl")
            .arg("--user")
            .args(args)
            .output()
            .context("failed to execute systemctl")
    }
}

impl Default for SystemdUser {
    fn default() -> Self {
        Self::new()
    }
}

impl Autostart for SystemdUser {
    fn mechanism(&self) -> &'static str {
        "systemd-user"
    }

    fn logical_name(&self) -> &'static str {
        UNIT_NAME
    }

    fn register(&self, spec: &ServiceSpec) -> Result<RegisterOutcome> {
        let existed = self.is_registered(&spec.name);
        let path = self.unit_path(&spec.name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create systemd user directory")?;
        }
        fs::write(&path, generate_unit(spec)).context("failed to write unit file")?;

        self.systemctl(&["daemon-reload"])?;
        let unit = format!("{}.service", spec.name);
        let output = self.systemctl(&["enable", "--now", &unit])?;
        if !output.status.success() {
            bail!(
                "systemctl enable failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(if existed { RegisterOutcome::Replaced } else { RegisterOutcome::Registered })
    }

    fn unregister(&self, name: &str) -> Result<UnregisterOutcome> {
        if !self.is_registered(name) {
            return Ok(UnregisterOutcome::NotFound);
        }
        let unit = format!("{name}.service");
        // Disable is best-effort: the unit file may be a stray leftover that
        // systemd never loaded.
        let _ = self.systemctl(&["disable", "--now", &unit]);
        let path = self.unit_path(name)?;
        if path.exists() {
            fs::remove_file(&path).context("failed to remove unit file")?;
        }
        let _ = self.systemctl(&["daemon-reload"]);
        Ok(UnregisterOutcome::Removed)
    }

    fn is_registered(&self, name: &str) -> bool {
        let unit = format!("{name}.service");
        let enabled = self
            .systemctl(&["is-enabled", &unit])
            .map(|o| o.status.success())
            .unwrap_or(false);
        if enabled {
            return true;
        }
        match self.unit_path(name) {
            Ok(path) => path.exists(),
            Err(e) => {
                debug!("systemd unit path lookup failed: {e:#}");
                false
            }
        }
    }
}

/// Generate the user unit. The agent handles its own crash recovery, so the
/// unit only restarts on failure.
fn generate_unit(spec: &ServiceSpec) -> String {
    let mut exec_start = spec.executable.display().to_string();
    for arg in &spec.args {
        exec_start.push(' ');
        exec_start.push_str(arg);
    }

    let mut content = String::with_capacity(512);
    content.push_str("[Unit]\n");
    content.push_str("Description=Syncthing file synchronization agent\n");
    content.push_str("Documentation=man:syncthing(1)\n");
    content.push_str("After=network.target\n");
    content.push('\n');
    content.push_str("[Service]\n");
    content.push_str(&format!("ExecStart={exec_start}\n"));
    content.push_str("Restart=on-failure\n");
    content.push_str("RestartSec=5s\n");
    content.push_str("SuccessExitStatus=3 4\n");
    content.push_str("RestartForceExitStatus=3 4\n");
    content.push('\n');
    content.push_str("[Install]\n");
    content.push_str("WantedBy=default.target\n");
    content
}
