//! OS autostart registration behind a single capability surface.
//!
//! One mechanism is selected per platform at startup - launchd on macOS, a
//! systemd user unit on Linux, a Task Scheduler logon task on Windows - and
//! never mixed within a run. Registration is idempotent: an existing
//! same-name entry is replaced, never treated as a hard error, and
//! unregistering a missing entry reports `NotFound` rather than failing.
//!
//! Entries are always looked up by their fixed logical name, because the
//! entry may have been created by an upstream official installer rather than
//! this tool.

mod launchd;
mod systemd;
mod taskscheduler;

use std::path::PathBuf;

use anyhow::Result;

pub use launchd::Launchd;
pub use systemd::SystemdUser;
pub use taskscheduler::TaskScheduler;

use crate::paths::InstallScope;
use crate::platform::Os;

/// An autostart entry to be registered: launch the agent at logon.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub executable: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    /// A same-name entry existed and was replaced.
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    Removed,
    NotFound,
}

pub trait Autostart {
    /// Short mechanism label for reports, e.g. `systemd-user`.
    fn mechanism(&self) -> &'static str;

    /// Fixed logical name the agent entry is registered and queried under.
    fn logical_name(&self) -> &'static str;

    fn register(&self, spec: &ServiceSpec) -> Result<RegisterOutcome>;

    fn unregister(&self, name: &str) -> Result<UnregisterOutcome>;

    fn is_registered(&self, name: &str) -> bool;
}

/// Select the mechanism for a platform. Called once at startup; nothing
/// downstream branches on the OS again.
pub fn for_platform(os: Os, scope: InstallScope) -> Box<dyn Autostart> {
    match os {
        Os::MacOs => Box::new(Launchd::new(scope)),
        Os::Linux => Box::new(SystemdUser::new()),
        Os::Windows => Box::new(TaskScheduler::new()),
    }
}
