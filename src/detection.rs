//! Installation state inspection.
//!
//! The filesystem, process table and service registry are ground truth: the
//! state is recomputed fresh on every call and never cached or persisted.
//! Inspection is side-effect-free apart from running the installed binary's
//! version query.

use std::path::Path;

use crate::agent::AgentControl;
use crate::autostart::Autostart;
use crate::paths::PathSet;

/// Snapshot of the installation markers at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationState {
    pub has_binary: bool,
    pub has_uninstaller: bool,
    pub has_shortcuts: bool,
    pub has_autostart: bool,
    /// Version reported by the binary; `None` when the binary is absent or
    /// not executable.
    pub version: Option<String>,
    pub is_running: bool,
}

impl InstallationState {
    /// Binary, uninstaller and shortcuts all present. Markers with no
    /// counterpart on the platform count as present; autostart is tracked
    /// separately as best-effort.
    pub fn is_complete(&self) -> bool {
        self.has_binary && self.has_uninstaller && self.has_shortcuts
    }

    /// Secondary markers missing from an otherwise usable install.
    pub fn missing_markers(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_uninstaller {
            missing.push("uninstaller");
        }
        if !self.has_shortcuts {
            missing.push("shortcuts");
        }
        missing
    }
}

/// Probe the markers for the given path set.
pub fn inspect(
    paths: &PathSet,
    autostart: &dyn Autostart,
    agent: &dyn AgentControl,
) -> InstallationState {
    let binary = paths.binary_path();
    let has_binary = binary.is_file();

    InstallationState {
        has_binary,
        has_uninstaller: paths
            .uninstaller_path
            .as_deref()
            .map(Path::is_file)
            .unwrap_or(true),
        has_shortcuts: paths
            .shortcut_dir
            .as_deref()
            .map(Path::is_dir)
            .unwrap_or(true),
        // Queried by logical name: the entry may have been created by an
        // upstream official installer rather than this tool.
        has_autostart: autostart.is_registered(autostart.logical_name()),
        version: if has_binary { agent.version(&binary) } else { None },
        is_running: agent.is_running(),
    }
}

/// Whether any installation marker exists at all, counting only markers the
/// platform actually has. Drives the nothing-to-uninstall check.
pub fn markers_present(paths: &PathSet, state: &InstallationState) -> bool {
    state.has_binary
        || state.has_autostart
        || paths.uninstaller_path.as_deref().is_some_and(Path::is_file)
        || paths.shortcut_dir.as_deref().is_some_and(Path::is_dir)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use super::*;
    use crate::autostart::{RegisterOutcome, ServiceSpec, UnregisterOutcome};

    struct FakeAutostart {
        registered: bool,
    }

    impl Autostart for FakeAutostart {
        fn mechanism(&self) -> &'static str {
            "fake"
        }

        fn logical_name(&self) -> &'static str {
            "syncthing"
        }

        fn register(&self, _spec: &ServiceSpec) -> anyhow::Result<RegisterOutcome> {
            Ok(RegisterOutcome::Registered)
        }

        fn unregister(&self, _name: &str) -> anyhow::Result<UnregisterOutcome> {
            Ok(UnregisterOutcome::NotFound)
        }

        fn is_registered(&self, _name: &str) -> bool {
            self.registered
        }
    }

    struct FakeAgent {
        version: Option<String>,
    }

    impl AgentControl for FakeAgent {
        fn is_running(&self) -> bool {
            false
        }

        fn version(&self, _binary: &Path) -> Option<String> {
            self.version.clone()
        }

        fn device_id(&self, _binary: &Path) -> Option<String> {
            None
        }

        fn stop(&self, _grace: Duration) {}

        fn gui_address(&self, _binary: &Path) -> Option<String> {
            None
        }

        fn set_gui_address(&self, _binary: &Path, _addr: &str) -> bool {
            false
        }

        fn restart(&self, _binary: &Path) -> bool {
            false
        }
    }

    fn unix_paths(root: &Path) -> PathSet {
        PathSet {
            install_dir: root.join("opt/syncthing"),
            config_dir: root.join("state/syncthing"),
            shortcut_dir: None,
            uninstaller_path: None,
            binary_name: "syncthing",
        }
    }

    fn windows_paths(root: &Path) -> PathSet {
        let install_dir = root.join("Programs/Syncthing");
        PathSet {
            uninstaller_path: Some(install_dir.join("unins000.exe")),
            config_dir: root.join("Syncthing"),
            shortcut_dir: Some(root.join("Start Menu/Syncthing")),
            install_dir,
            binary_name: "syncthing.exe",
        }
    }

    #[test]
    fn absent_target_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = unix_paths(dir.path());
        let state = inspect(
            &paths,
            &FakeAutostart { registered: false },
            &FakeAgent { version: None },
        );
        assert!(!state.has_binary);
        assert!(!state.is_complete());
        assert_eq!(state.version, None);
        assert!(!markers_present(&paths, &state));
    }

    #[test]
    fn binary_alone_completes_platforms_without_secondary_markers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = unix_paths(dir.path());
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::write(paths.binary_path(), b"elf").unwrap();

        let state = inspect(
            &paths,
            &FakeAutostart { registered: false },
            &FakeAgent { version: Some("v1.27.12".into()) },
        );
        assert!(state.is_complete());
        assert_eq!(state.version.as_deref(), Some("v1.27.12"));
        assert!(state.missing_markers().is_empty());
    }

    #[test]
    fn unexecutable_binary_is_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = unix_paths(dir.path());
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::write(paths.binary_path(), b"not really a binary").unwrap();

        let state = inspect(
            &paths,
            &FakeAutostart { registered: false },
            &FakeAgent { version: None },
        );
        assert!(state.has_binary);
        assert_eq!(state.version, None);
    }

    #[test]
    fn missing_secondary_markers_are_listed_precisely() {
        let dir = tempfile::tempdir().unwrap();
        let paths = windows_paths(dir.path());
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::write(paths.binary_path(), b"mz").unwrap();

        let state = inspect(
            &paths,
            &FakeAutostart { registered: false },
            &FakeAgent { version: None },
        );
        assert!(!state.is_complete());
        assert_eq!(state.missing_markers(), vec!["uninstaller", "shortcuts"]);
    }

    #[test]
    fn stray_autostart_entry_counts_as_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        let paths = unix_paths(dir.path());
        let state = inspect(
            &paths,
            &FakeAutostart { registered: true },
            &FakeAgent { version: None },
        );
        assert!(!state.has_binary);
        assert!(markers_present(&paths, &state));
    }

    #[test]
    fn state_is_recomputed_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let paths = unix_paths(dir.path());
        let autostart = FakeAutostart { registered: false };
        let agent = FakeAgent { version: None };

        assert!(!inspect(&paths, &autostart, &agent).has_binary);
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::write(paths.binary_path(), b"elf").unwrap();
        assert!(inspect(&paths, &autostart, &agent).has_binary);
    }

    // Keep the test path sets honest against the real resolver shape.
    #[test]
    fn resolver_and_test_fixtures_agree_on_binary_names() {
        let real = crate::paths::PathSet::resolve(
            crate::platform::Os::Linux,
            crate::paths::InstallScope::CurrentUser,
        )
        .unwrap();
        assert_eq!(real.binary_name, unix_paths(PathBuf::from("/x").as_path()).binary_name);
    }
}
