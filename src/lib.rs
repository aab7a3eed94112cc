//! Installer and lifecycle manager for the Syncthing agent used by
//! scratch-sync.
//!
//! The crate detects the current installation state, reconciles it toward the
//! desired state (install/uninstall), and registers the agent with the
//! platform's autostart facility:
//!
//! - [`platform`] - host OS/architecture detection and canonical identifiers
//! - [`paths`] - scope-dependent filesystem layout
//! - [`detection`] - read-only installation state inspection
//! - [`fetch`] - release resolution and artifact download
//! - [`installer`] - silent installation of a downloaded artifact
//! - [`autostart`] - launchd / systemd-user / Task Scheduler registration
//! - [`orchestration`] - the install state machine
//! - [`uninstall`] - teardown, with optional configuration purge
//! - [`status`] - status report plus companion-tool probes

pub mod agent;
pub mod autostart;
pub mod cli;
pub mod clock;
pub mod detection;
pub mod error;
pub mod fetch;
pub mod installer;
pub mod invocation;
pub mod orchestration;
pub mod paths;
pub mod platform;
pub mod status;
pub mod uninstall;

pub use error::{SetupError, Warning};
