//! # Environment Module
//!
//! Process-wide application environment: which stage the process runs in
//! (DEV, STAGING, PRODUCTION) and where the application's directories live.
//!
//! The state is initialized explicitly at start-up by the host (usually right
//! after reading its command line) and read by everything else. Reads and writes go
//! through a `parking_lot::RwLock`, so concurrent requests may read while a test or a
//! host reconfigures it.
//!
//! ## Environment Variables
//!
//! ### `VOODOO_ENV`
//!
//! `dev`, `staging` or `production`. Anything else, or unset, means `dev`.
//!
//! ## Usage
//!
//! ```rust
//! use voodoo::env;
//!
//! env::set_app_path("/srv/site");
//! assert!(env::config_path().unwrap().ends_with("App/_config"));
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::env as std_env;
use std::path::{Path, PathBuf};

/// Deployment stage the process runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "staging" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Dev,
        }
    }

    /// Read `VOODOO_ENV`.
    pub fn from_env() -> Self {
        std_env::var("VOODOO_ENV")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Paths {
    front_controller: Option<PathBuf>,
    app: Option<PathBuf>,
    config: Option<PathBuf>,
    public_assets: Option<PathBuf>,
}

#[derive(Debug)]
struct EnvState {
    environment: Environment,
    paths: Paths,
}

static STATE: Lazy<RwLock<EnvState>> = Lazy::new(|| {
    RwLock::new(EnvState {
        environment: Environment::from_env(),
        paths: Paths::default(),
    })
});

pub fn set_environment(environment: Environment) {
    STATE.write().environment = environment;
}

pub fn environment() -> Environment {
    STATE.read().environment
}

pub fn is_dev() -> bool {
    environment() == Environment::Dev
}

pub fn is_staging() -> bool {
    environment() == Environment::Staging
}

pub fn is_production() -> bool {
    environment() == Environment::Production
}

/// Directory the front controller (entry point) runs from.
pub fn set_front_controller_path(root: impl AsRef<Path>) {
    STATE.write().paths.front_controller = Some(root.as_ref().to_path_buf());
}

pub fn front_controller_path() -> Option<PathBuf> {
    STATE.read().paths.front_controller.clone()
}

/// Set the application directory to `{root}/App`.
///
/// The config directory defaults to `{root}/App/_config` unless one was set before.
pub fn set_app_path(root: impl AsRef<Path>) {
    let mut state = STATE.write();
    let app = root.as_ref().join("App");
    if state.paths.config.is_none() {
        state.paths.config = Some(app.join("_config"));
    }
    state.paths.app = Some(app);
}

pub fn app_path() -> Option<PathBuf> {
    STATE.read().paths.app.clone()
}

pub fn set_config_path(path: impl AsRef<Path>) {
    STATE.write().paths.config = Some(path.as_ref().to_path_buf());
}

/// Directory holding process-wide config files such as `DB.yaml`.
pub fn config_path() -> Option<PathBuf> {
    STATE.read().paths.config.clone()
}

/// Set the public assets directory to `{root}/assets`.
pub fn set_public_assets_path(root: impl AsRef<Path>) {
    STATE.write().paths.public_assets = Some(root.as_ref().join("assets"));
}

pub fn public_assets_path() -> Option<PathBuf> {
    STATE.read().paths.public_assets.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" Staging "), Environment::Staging);
        assert_eq!(Environment::parse("whatever"), Environment::Dev);
    }

    // Paths are process-wide, so every assertion about them lives in this one test.
    #[test]
    fn test_paths_and_stage() {
        set_app_path("/srv/site");
        assert_eq!(app_path(), Some(PathBuf::from("/srv/site/App")));
        let config = config_path().unwrap();
        set_app_path("/srv/other");
        assert_eq!(config_path(), Some(config));

        set_public_assets_path("/srv/site/public");
        assert_eq!(
            public_assets_path(),
            Some(PathBuf::from("/srv/site/public/assets"))
        );

        set_front_controller_path("/srv/site/public");
        assert_eq!(
            front_controller_path(),
            Some(PathBuf::from("/srv/site/public"))
        );

        set_environment(Environment::Staging);
        assert!(is_staging());
        assert!(!is_production());
        set_environment(Environment::Dev);
        assert!(is_dev());
    }
}
