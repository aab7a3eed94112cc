//! Task Scheduler registration (Windows).
//!
//! Drives `schtasks.exe` to maintain a logon task. `/Create /F` replaces an
//! existing same-name task, which is what makes registration idempotent.

use std::process::Command;

use anyhow::{Context, Result, bail};

use super::{Autostart, RegisterOutcome, ServiceSpec, UnregisterOutcome};

const TASK_NAME: &str = "Syncthing";

pub struct TaskScheduler;

impl TaskScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Autostart for TaskScheduler {
    fn mechanism(&self) -> &'static str {
        "task-scheduler"
    }

    fn logical_name(&self) -> &'static str {
        TASK_NAME
    }

    fn register(&self, spec: &ServiceSpec) -> Result<RegisterOutcome> {
        let existed = self.is_registered(&spec.name);
        let output = Command::new("schtasks")
            .args(["/Create", "/TN", &spec.name, "/TR", &task_run_command(spec)])
            .args(["/SC", "ONLOGON", "/F"])
            .output()
            .context("failed to execute schtasks")?;
        if !output.status.success() {
            bail!(
                "schtasks /Create failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // Kick the task off once so the agent is up before the next logon.
        let _ = Command::new("schtasks")
            .args(["/Run", "/TN", &spec.name])
            .output();

        Ok(if existed { RegisterOutcome::Replaced } else { RegisterOutcome::Registered })
    }

    fn unregister(&self, name: &str) -> Result<UnregisterOutcome> {
        if !self.is_registered(name) {
            return Ok(UnregisterOutcome::NotFound);
        }
        let output = Command::new("schtasks")
            .args(["/Delete", "/TN", name, "/F"])
            .output()
            .context("failed to execute schtasks")?;
        if !output.status.success() {
            bail!(
                "schtasks /Delete failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(UnregisterOutcome::Removed)
    }

    fn is_registered(&self, name: &str) -> bool {
        Command::new("schtasks")
            .args(["/Query", "/TN", name])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Build the `/TR` command line: quoted executable plus its arguments.
fn task_run_command(spec: &ServiceSpec) -> String {
    let mut run = format!("\"{}\"", spec.executable.display());
    for arg in &spec.args {
        run.push(' ');
        run.push_str(arg);
    }
    run
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn run_command_quotes_the_executable() {
        let spec = ServiceSpec {
            name: TASK_NAME.to_string(),
            executable: PathBuf::from(r"C:\Program Files\Syncthing\syncthing.exe"),
            args: vec!["serve".into(), "--no-console".into(), "--no-browser".into()],
        };
        assert_eq!(
            task_run_command(&spec),
            r#""C:\Program Files\Syncthing\syncthing.exe" serve --no-console --no-browser"#
        );
    }
}
