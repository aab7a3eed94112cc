use clap::{Parser, Subcommand, ValueEnum};

use crate::paths::InstallScope;

#[derive(Parser, Debug)]
#[command(version, about = "Installs and manages the Syncthing agent for scratch-sync")]
pub struct Args {
    /// Sub-commands (install is the default)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Install or repair the sync agent (default if no sub-command)
    Install {
        /// Installation scope
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,

        /// Do not register the autostart entry
        #[arg(long)]
        skip_service: bool,

        /// Pin an explicit release tag instead of resolving the latest
        #[arg(long, value_name = "TAG")]
        agent_version: Option<String>,
    },
    /// Remove the sync agent
    Uninstall {
        /// Installation scope the agent was installed under
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,

        /// Also delete the agent's configuration data
        #[arg(long)]
        purge: bool,
    },
    /// Show installation and companion status (always exits 0)
    Status {
        /// Installation scope to inspect
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ScopeArg {
    CurrentUser,
    AllUsers,
}

impl From<ScopeArg> for InstallScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::CurrentUser => InstallScope::CurrentUser,
            ScopeArg::AllUsers => InstallScope::AllUsers,
        }
    }
}
