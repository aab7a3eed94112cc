//! launchd registration (macOS).
//!
//! Writes a property list under LaunchAgents (or LaunchDaemons for the
//! machine scope) and loads it with `launchctl`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::debug;
use plist::Value;

use super::{Autostart, RegisterOutcome, ServiceSpec, UnregisterOutcome};
use crate::paths::InstallScope;

const LABEL: &str = "com.github.syncthing";

pub struct Launchd {
    scope: InstallScope,
}

impl Launchd {
    pub fn new(scope: InstallScope) -> Self {
        Self { scope }
    }

    fn plist_path(&self, name: &str) -> Result<PathBuf> {
        let dir = match self.scope {
            InstallScope::CurrentUser => dirs::home_dir()
                .context("home directory not resolvable")?
                .join("Library/LaunchAgents"),
            InstallScope::AllUsers => PathBuf::from("/Library/LaunchDaemons"),
        };
        Ok(dir.join(format!("{name}.plist")))
    }
}

impl Autostart for Launchd {
    fn mechanism(&self) -> &'static str {
        "launchd"
    }

    fn logical_name(&self) -> &'static str {
        LABEL
    }

    fn register(&self, spec: &ServiceSpec) -> Result<RegisterOutcome> {
        let path = self.plist_path(&spec.name)?;
        let existed = self.is_registered(&spec.name);
        if existed {
            // Unload before rewriting so launchctl picks up the new job.
            let _ = Command::new("launchctl").arg("unload").arg(&path).output();
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create launch agent directory")?;
        }
        fs::write(&path, generate_plist(spec)?).context("failed to write launch agent plist")?;

        let output = Command::new("launchctl")
            .args(["load", "-w"])
            .arg(&path)
            .output()
            .context("failed to execute launchctl")?;
        if !output.status.success() {
            bail!("launchctl load failed: {}", String::from_utf8_lossy(&output.stderr).trim());
        }

        Ok(if existed { RegisterOutcome::Replaced } else { RegisterOutcome::Registered })
    }

    fn unregister(&self, name: &str) -> Result<UnregisterOutcome> {
        if !self.is_registered(name) {
            return Ok(UnregisterOutcome::NotFound);
        }
        let path = self.plist_path(name)?;
        // Unload is best-effort: the job may exist only as a stray plist.
        let _ = Command::new("launchctl").arg("unload").arg(&path).output();
        if path.exists() {
            fs::remove_file(&path).context("failed to remove launch agent plist")?;
        }
        Ok(UnregisterOutcome::Removed)
    }

    fn is_registered(&self, name: &str) -> bool {
        let loaded = Command::new("launchctl")
            .args(["list", name])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if loaded {
            return true;
        }
        match self.plist_path(name) {
            Ok(path) => path.exists(),
            Err(e) => {
                debug!("launchd path lookup failed: {e:#}");
                false
            }
        }
    }
}

/// Generate the launch agent property list: run at load, no keep-alive (the
/// agent manages its own restarts).
fn generate_plist(spec: &ServiceSpec) -> Result<Vec<u8>> {
    let mut dict = HashMap::new();
    dict.insert("Label".to_string(), Value::String(spec.name.clone()));

    let mut program_args = vec![Value::String(spec.executable.display().to_string())];
    program_args.extend(spec.args.iter().map(|a| Value::String(a.clone())));
    dict.insert("ProgramArguments".to_string(), Value::Array(program_args));

    dict.insert("RunAtLoad".to_string(), Value::Boolean(true));
    dict.insert("KeepAlive".to_string(), Value::Boolean(false));
    dict.insert("ProcessType".to_string(), Value::String("Background".to_string()));

    let mut buf = Vec::new();
    plist::to_writer_xml(&mut buf, &Value::Dictionary(dict.into_iter().collect()))
        .context("failed to serialize launch agent plist")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plist_carries_label_and_program_arguments() {
        let spec = ServiceSpec {
            name: LABEL.to_string(),
            executable: PathBuf::from("/opt/syncthing/syncthing"),
            args: vec!["serve".into(), "--no-browser".into()],
        };
        let xml = String::from_utf8(generate_plist(&spec).unwrap()).unwrap();
        assert!(xml.contains("com.github.syncthing"));
        assert!(xml.contains("/opt/syncthing/syncthing"));
        assert!(xml.contains("--no-browser"));
        assert!(xml.contains("RunAtLoad"));
    }
}
