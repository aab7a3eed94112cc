use anyhow::Result;
use clap::Parser;
use log::error;

use scratch_sync_setup::agent::SyncthingControl;
use scratch_sync_setup::autostart;
use scratch_sync_setup::cli::{self, Cmd};
use scratch_sync_setup::clock::SystemClock;
use scratch_sync_setup::fetch::GithubSource;
use scratch_sync_setup::installer::HostRunner;
use scratch_sync_setup::invocation::{self, EnvOverrides};
use scratch_sync_setup::orchestration::{self, Deps, InstallReport};
use scratch_sync_setup::paths::{InstallScope, PathSet};
use scratch_sync_setup::platform::PlatformId;
use scratch_sync_setup::status;
use scratch_sync_setup::uninstall::{self, UninstallReport};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = real_main() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let args = cli::Args::parse();
    // Ambient invocation flags become explicit values here, once; nothing
    // downstream reads the environment.
    let env = EnvOverrides::capture();

    match args.sub.unwrap_or(Cmd::Install {
        scope: None,
        skip_service: false,
        agent_version: None,
    }) {
        Cmd::Install { scope, skip_service, agent_version } => {
            let opts = invocation::install_options(
                scope.map(InstallScope::from),
                skip_service,
                agent_version,
                &env,
            );
            let platform = PlatformId::detect()?;
            let report = with_deps(platform, opts.scope, |deps| {
                orchestration::run_install(deps, &opts)
            })?;
            print_install_report(&report);
            Ok(())
        }
        Cmd::Uninstall { scope, purge } => {
            let scope = invocation::scope_or_default(scope.map(InstallScope::from), &env);
            let platform = PlatformId::detect()?;
            let report = with_deps(platform, scope, |deps| {
                uninstall::run_uninstall(deps, purge)
            })?;
            print_uninstall_report(&report);
            Ok(())
        }
        Cmd::Status { scope } => {
            // Status is read-only and always exits 0, even when the host
            // itself cannot be probed.
            let scope = invocation::scope_or_default(scope.map(InstallScope::from), &env);
            let probed = PlatformId::detect().map_err(anyhow::Error::from).and_then(|platform| {
                with_deps(platform, scope, |deps| {
                    status::run_status(deps);
                    Ok(())
                })
            });
            if let Err(e) = probed {
                println!("status unavailable: {e:#}");
            }
            Ok(())
        }
    }
}

/// Wire the real collaborators for one run and hand them to `f`.
fn with_deps<T>(
    platform: PlatformId,
    scope: InstallScope,
    f: impl FnOnce(&Deps) -> Result<T, scratch_sync_setup::SetupError>,
) -> Result<T> {
    let paths = PathSet::resolve(platform.os, scope)?;
    let clock = SystemClock;
    let source = GithubSource::new()?;
    let runner = HostRunner::new(&clock);
    let registrar = autostart::for_platform(platform.os, scope);
    let agent = SyncthingControl::new(&clock);

    let deps = Deps {
        platform,
        paths: &paths,
        source: &source,
        runner: &runner,
        autostart: registrar.as_ref(),
        agent: &agent,
        clock: &clock,
    };
    Ok(f(&deps)?)
}

fn print_install_report(report: &InstallReport) {
    let version = report.version.as_deref().unwrap_or("unknown");
    if report.already_installed {
        println!("already installed: {version}");
    } else if report.state.is_complete() {
        println!("installed syncthing {version}");
    } else {
        println!("installed syncthing {version} (incomplete)");
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
}

fn print_uninstall_report(report: &UninstallReport) {
    println!("syncthing removed");
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    if let Some(dir) = &report.config_preserved {
        println!("configuration preserved at {} (pass --purge to delete it)", dir.display());
    }
}
