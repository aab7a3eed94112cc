//! Invocation configuration assembled once at process entry.
//!
//! The curl-pipe bootstrap scripts cannot pass flags, so they drive the tool
//! through `SCRATCH_SYNC_*` environment variables. Those are read exactly
//! once here and merged with the parsed CLI arguments into explicit values;
//! core logic never touches the environment.

use crate::fetch::DesiredVersion;
use crate::orchestration::InstallOptions;
use crate::paths::InstallScope;

/// Environment-provided defaults, captured at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub scope: Option<InstallScope>,
    pub skip_service: bool,
    pub version: Option<String>,
}

impl EnvOverrides {
    pub fn capture() -> Self {
        Self {
            scope: std::env::var("SCRATCH_SYNC_SCOPE")
                .ok()
                .as_deref()
                .and_then(parse_scope),
            skip_service: std::env::var("SCRATCH_SYNC_SKIP_SERVICE")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            version: std::env::var("SCRATCH_SYNC_VERSION")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}

/// Merge CLI arguments with the captured environment; explicit flags win.
pub fn install_options(
    cli_scope: Option<InstallScope>,
    cli_skip_service: bool,
    cli_version: Option<String>,
    env: &EnvOverrides,
) -> InstallOptions {
    let version = cli_version
        .or_else(|| env.version.clone())
        .map(DesiredVersion::Pinned)
        .unwrap_or(DesiredVersion::Latest);
    InstallOptions {
        scope: cli_scope.or(env.scope).unwrap_or(InstallScope::CurrentUser),
        skip_service: cli_skip_service || env.skip_service,
        version,
    }
}

pub fn scope_or_default(cli_scope: Option<InstallScope>, env: &EnvOverrides) -> InstallScope {
    cli_scope.or(env.scope).unwrap_or(InstallScope::CurrentUser)
}

fn parse_scope(raw: &str) -> Option<InstallScope> {
    match raw.to_ascii_lowercase().as_str() {
        "current-user" | "user" => Some(InstallScope::CurrentUser),
        "all-users" | "all" | "system" => Some(InstallScope::AllUsers),
        _ => None,
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_win_over_environment() {
        let env = EnvOverrides {
            scope: Some(InstallScope::AllUsers),
            skip_service: false,
            version: Some("v1.20.0".into()),
        };
        let opts = install_options(
            Some(InstallScope::CurrentUser),
            true,
            Some("v1.27.12".into()),
            &env,
        );
        assert_eq!(opts.scope, InstallScope::CurrentUser);
        assert!(opts.skip_service);
        assert_eq!(opts.version, DesiredVersion::Pinned("v1.27.12".into()));
    }

    #[test]
    fn environment_fills_missing_flags() {
        let env = EnvOverrides {
            scope: Some(InstallScope::AllUsers),
            skip_service: true,
            version: None,
        };
        let opts = install_options(None, false, None, &env);
        assert_eq!(opts.scope, InstallScope::AllUsers);
        assert!(opts.skip_service);
        assert_eq!(opts.version, DesiredVersion::Latest);
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let opts = install_options(None, false, None, &EnvOverrides::default());
        assert_eq!(opts.scope, InstallScope::CurrentUser);
        assert!(!opts.skip_service);
        assert_eq!(opts.version, DesiredVersion::Latest);
    }

    #[test]
    fn scope_spellings_parse() {
        assert_eq!(parse_scope("all-users"), Some(InstallScope::AllUsers));
        assert_eq!(parse_scope("ALL"), Some(InstallScope::AllUsers));
        assert_eq!(parse_scope("user"), Some(InstallScope::CurrentUser));
        assert_eq!(parse_scope("everything"), None);
    }
}
