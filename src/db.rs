//! # Database Connection Cache
//!
//! One connection per alias, created on first use and shared afterwards.
//!
//! Aliases are sections of the `DB` config:
//!
//! ```yaml
//! MyDB:
//!   type: mysql          # mysql | pgsql | sqlite | dsn
//!   host: localhost
//!   port: 3306
//!   user: root
//!   password: ""
//!   dbname: blog
//! Local:
//!   type: sqlite
//!   dsn: data/blog.sqlite
//! Cache:
//!   type: dsn
//!   dsn: 127.0.0.1:6379
//!   dsnClient: redis
//! ```
//!
//! The manager knows nothing about drivers: a [`Connector`] turns the parsed
//! [`DataSource`] into a connection. Concurrent first callers of one alias race on
//! a per-alias cell, so the connector runs once per alias.

use crate::config::{self, Config, ConfigError};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the shared config holding data source aliases.
pub const DB_CONFIG: &str = "DB";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database alias '{alias}' config doesn't exist")]
    MissingAlias { alias: String },

    #[error("Invalid type for alias '{alias}': '{kind}' was provided")]
    InvalidType { alias: String, kind: String },

    #[error("Invalid settings for alias '{alias}': {message}")]
    Settings { alias: String, message: String },

    #[error("Connecting alias '{alias}' failed: {source}")]
    Connect {
        alias: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Kind of data source an alias declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Mysql,
    Pgsql,
    Sqlite,
    /// Any other store reached through a raw data source name (Redis, MongoDB, ...)
    Dsn,
}

impl DbKind {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Some(DbKind::Mysql),
            "pgsql" => Some(DbKind::Pgsql),
            "sqlite" => Some(DbKind::Sqlite),
            "dsn" => Some(DbKind::Dsn),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DbKind::Mysql => "mysql",
            DbKind::Pgsql => "pgsql",
            DbKind::Sqlite => "sqlite",
            DbKind::Dsn => "dsn",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    #[serde(rename = "type")]
    kind: String,
    host: Option<String>,
    #[serde(deserialize_with = "port_from_any")]
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    #[serde(alias = "dbName", alias = "dbname")]
    db_name: Option<String>,
    #[serde(alias = "dbFile")]
    db_file: Option<String>,
    dsn: Option<String>,
    #[serde(alias = "dsnClient", alias = "dsnDependency")]
    dsn_client: Option<String>,
}

/// Ports are written as numbers or strings; empty and zero mean unset.
fn port_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    let port = match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse().ok(),
        _ => None,
    };
    Ok(port.filter(|p| *p != 0))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Connection settings of one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub alias: String,
    pub kind: DbKind,
    /// `mysql:host=localhost;dbname=blog;port=3306`, `sqlite:data/blog.sqlite`, or the raw dsn
    pub dsn: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Client the raw dsn is meant for (`dsn` kind only)
    pub client: Option<String>,
}

impl DataSource {
    /// Read alias `alias` from `config`.
    pub fn from_config(alias: &str, config: &Config) -> Result<Self, DbError> {
        let section = config
            .get(alias)
            .filter(|v| v.is_object())
            .ok_or_else(|| DbError::MissingAlias {
                alias: alias.to_string(),
            })?;
        Self::from_value(alias, section.clone())
    }

    /// Parse one alias section.
    pub fn from_value(alias: &str, section: Value) -> Result<Self, DbError> {
        let settings_err = |message: String| DbError::Settings {
            alias: alias.to_string(),
            message,
        };
        let settings: Settings =
            serde_json::from_value(section).map_err(|e| settings_err(e.to_string()))?;
        let kind = DbKind::parse(&settings.kind).ok_or_else(|| DbError::InvalidType {
            alias: alias.to_string(),
            kind: settings.kind.clone(),
        })?;

        let (dsn, client) = match kind {
            DbKind::Mysql | DbKind::Pgsql => {
                let host = non_empty(settings.host)
                    .ok_or_else(|| settings_err("host is required".to_string()))?;
                let db_name = settings.db_name.unwrap_or_default();
                let port = settings
                    .port
                    .map(|p| format!(";port={p}"))
                    .unwrap_or_default();
                (
                    format!("{}:host={host};dbname={db_name}{port}", kind.as_str()),
                    None,
                )
            }
            DbKind::Sqlite => {
                let file = non_empty(settings.db_file)
                    .or_else(|| non_empty(settings.dsn))
                    .ok_or_else(|| settings_err("dbFile or dsn is required".to_string()))?;
                (format!("sqlite:{file}"), None)
            }
            DbKind::Dsn => {
                let dsn = non_empty(settings.dsn)
                    .ok_or_else(|| settings_err("dsn is required".to_string()))?;
                (dsn, non_empty(settings.dsn_client))
            }
        };

        Ok(Self {
            alias: alias.to_string(),
            kind,
            dsn,
            user: non_empty(settings.user),
            password: settings.password,
            client,
        })
    }
}

/// Opens connections described by a [`DataSource`].
pub trait Connector: Send + Sync {
    type Connection: Send + Sync;

    fn connect(&self, source: &DataSource) -> anyhow::Result<Self::Connection>;
}

/// Keyed connection cache: alias -> connection, populated at most once per alias.
///
/// Meant to live for the whole process (in a `static` or an `Arc` shared by the
/// host); every controller instance reads through it.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: Arc<Config>,
    connections: DashMap<String, Arc<OnceCell<Arc<C::Connection>>>>,
}

impl<C: Connector> ConnectionManager<C> {
    #[must_use]
    pub fn new(connector: C, config: Arc<Config>) -> Self {
        Self {
            connector,
            config,
            connections: DashMap::new(),
        }
    }

    /// Manager reading aliases from the process-wide `DB` config.
    pub fn from_shared_config(connector: C) -> Result<Self, ConfigError> {
        Ok(Self::new(connector, config::shared(DB_CONFIG)?))
    }

    /// Connection for `alias`, opened on first use.
    ///
    /// A failed first attempt leaves the alias unconnected; the next call retries.
    pub fn connect(&self, alias: &str) -> Result<Arc<C::Connection>, DbError> {
        let cell = Arc::clone(
            &self
                .connections
                .entry(alias.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        if let Some(conn) = cell.get() {
            return Ok(Arc::clone(conn));
        }

        cell.get_or_try_init(|| {
            let source = DataSource::from_config(alias, &self.config)?;
            debug!(alias = %alias, kind = source.kind.as_str(), "Opening connection");
            let conn = self.connector.connect(&source).map_err(|e| {
                warn!(alias = %alias, error = %e, "Connection failed");
                DbError::Connect {
                    alias: alias.to_string(),
                    source: e,
                }
            })?;
            info!(
                alias = %alias,
                kind = source.kind.as_str(),
                total_connections = self.connections.len(),
                "Connection established"
            );
            Ok(Arc::new(conn))
        })
        .map(Arc::clone)
    }

    #[must_use]
    pub fn is_connected(&self, alias: &str) -> bool {
        self.connections
            .get(alias)
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Drop the cached connection for `alias`; the next `connect` opens a new one.
    pub fn disconnect(&self, alias: &str) -> bool {
        self.connections.remove(alias).is_some()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
