//! # Configuration Module
//!
//! Dot-path configuration assembled from one or more files.
//!
//! Files are parsed by extension (`.yaml`/`.yml`, `.toml`, `.json`) into a single
//! JSON tree. Loading a second file deep-merges it over the first: objects merge key
//! by key, any other value replaces what was there. A controller loads its
//! application's `Config.*` first and its module's `Config.*` second, so module
//! values win.
//!
//! ```rust
//! use voodoo::config::Config;
//! use serde_json::json;
//!
//! let mut config = Config::from_value(json!({ "views": { "layout": "_layouts/main" } }));
//! config.merge(json!({ "views": { "dateFormat": "Y-m-d" } }));
//! assert_eq!(config.get_str("views.layout"), Some("_layouts/main"));
//! assert_eq!(config.get_str("views.dateFormat"), Some("Y-m-d"));
//! ```
//!
//! ## Shared configs
//!
//! Process-wide configs (for example `DB`) are loaded once per name from the
//! environment's config directory by [`shared`], or installed up front with
//! [`register_shared`].

use crate::env;
use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Extensions tried, in order, when looking a config up by name.
pub const EXTENSIONS: [&str; 4] = ["yaml", "yml", "toml", "json"];

/// File stem of per-application and per-module config files.
pub const CONTROLLER_CONFIG: &str = "Config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format for '{path}'")]
    UnsupportedFormat { path: PathBuf },

    #[error("no config named '{name}' found in {dir:?}")]
    NotFound { name: String, dir: Option<PathBuf> },
}

/// Merged configuration tree addressed by dot-separated paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
    sources: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let mut config = Self::new();
        config.merge(value);
        config
    }

    /// Find `{dir}/{stem}.{ext}` for the first extension in [`EXTENSIONS`] that exists.
    #[must_use]
    pub fn locate(dir: &Path, stem: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|p| p.is_file())
    }

    /// Parse `path` and merge it over the current tree.
    pub fn load_file(&mut self, path: &Path) -> Result<&mut Self, ConfigError> {
        let value = parse_file(path)?;
        debug!(path = %path.display(), "Config file loaded");
        self.merge(value);
        self.sources.push(path.to_path_buf());
        Ok(self)
    }

    /// Load `{dir}/{stem}.*` if it exists. Returns whether a file was merged.
    pub fn load_optional(&mut self, dir: &Path, stem: &str) -> Result<bool, ConfigError> {
        match Self::locate(dir, stem) {
            Some(path) => {
                self.load_file(&path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deep-merge `overlay` over the current tree.
    pub fn merge(&mut self, overlay: Value) {
        deep_merge(&mut self.root, overlay);
    }

    /// Value at a dot-separated path; the empty path returns the whole tree.
    #[must_use]
    pub fn get(&self, dot_path: &str) -> Option<&Value> {
        dot_path
            .split('.')
            .filter(|s| !s.is_empty())
            .try_fold(&self.root, |node, key| match node {
                Value::Object(map) => map.get(key),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    #[must_use]
    pub fn get_str(&self, dot_path: &str) -> Option<&str> {
        self.get(dot_path).and_then(Value::as_str)
    }

    /// Files merged into this config, in load order.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

fn parse_file(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))
        }
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, Value::Null) if !base.is_null() => {}
        (base, overlay) => *base = overlay,
    }
}

static SHARED: Lazy<DashMap<String, Arc<OnceCell<Arc<Config>>>>> = Lazy::new(DashMap::new);

/// Process-wide config `name`, loaded from [`env::config_path`] on first use.
///
/// Concurrent first callers race on a per-name cell, so the file is parsed once.
pub fn shared(name: &str) -> Result<Arc<Config>, ConfigError> {
    let cell = Arc::clone(
        &SHARED
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new())),
    );
    cell.get_or_try_init(|| {
        let dir = env::config_path();
        let path = dir
            .as_deref()
            .and_then(|d| Config::locate(d, name))
            .ok_or_else(|| ConfigError::NotFound {
                name: name.to_string(),
                dir: dir.clone(),
            })?;
        let mut config = Config::new();
        config.load_file(&path)?;
        info!(name = %name, path = %path.display(), "Shared config loaded");
        Ok(Arc::new(config))
    })
    .cloned()
}

/// Install `config` as the process-wide config `name`, replacing any previous one.
pub fn register_shared(name: &str, config: Config) {
    SHARED.insert(
        name.to_string(),
        Arc::new(OnceCell::from(Arc::new(config))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_walks_dot_path() {
        let config = Config::from_value(json!({
            "views": { "layout": "_layouts/main", "sizes": [10, 20] },
            "debug": true
        }));
        assert_eq!(config.get_str("views.layout"), Some("_layouts/main"));
        assert_eq!(config.get("views.sizes.1"), Some(&json!(20)));
        assert_eq!(config.get("debug"), Some(&json!(true)));
        assert!(config.get("views.missing").is_none());
        assert!(config.get("debug.deeper").is_none());
        assert!(config.get("").is_some());
    }

    #[test]
    fn test_merge_later_values_win() {
        let mut config = Config::from_value(json!({
            "views": { "layout": "app", "dateFormat": "Y" },
            "name": "app"
        }));
        config.merge(json!({ "views": { "layout": "module" }, "extra": 1 }));
        assert_eq!(config.get_str("views.layout"), Some("module"));
        assert_eq!(config.get_str("views.dateFormat"), Some("Y"));
        assert_eq!(config.get_str("name"), Some("app"));
        assert_eq!(config.get("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_load_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Config.toml"),
            "[views]\nlayout = \"toml-layout\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("Other.yaml"), "views:\n  layout: yaml-layout\n").unwrap();

        let mut config = Config::new();
        assert!(config.load_optional(dir.path(), "Config").unwrap());
        assert_eq!(config.get_str("views.layout"), Some("toml-layout"));
        assert!(!config.load_optional(dir.path(), "Missing").unwrap());

        config.load_file(&dir.path().join("Other.yaml")).unwrap();
        assert_eq!(config.get_str("views.layout"), Some("yaml-layout"));
        assert_eq!(config.sources().len(), 2);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::new().load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_registered_shared_config_is_returned() {
        register_shared(
            "UnitShared",
            Config::from_value(json!({ "MyDB": { "type": "sqlite" } })),
        );
        let config = shared("UnitShared").unwrap();
        assert_eq!(config.get_str("MyDB.type"), Some("sqlite"));
    }
}
