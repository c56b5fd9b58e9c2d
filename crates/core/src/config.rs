//! YAML configuration for the migration tool
//!
//! The file carries the PostgreSQL connection parameters under a `postgres`
//! key and, optionally, the ledger table location under `migrations`.
//! Unknown keys are ignored so the same file can be shared with other tools.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Default name of the table that records applied migrations
pub const DEFAULT_LEDGER_TABLE: &str = "gorp_migrations";

/// Top-level configuration document
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub migrations: LedgerSettings,
}

/// Connection parameters for the target database
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: i64,
    pub user: String,
    #[serde(default)]
    pub pass: String,
    pub dbname: String,
    #[serde(default)]
    pub connections: Option<PoolSettings>,
}

// Keeps the password out of logs and panic messages.
impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"***")
            .field("dbname", &self.dbname)
            .field("connections", &self.connections)
            .finish()
    }
}

/// Optional pool tuning, passed straight through to the driver
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_idle: Option<u32>,
    pub max_open: Option<u32>,
    /// Seconds; `0` keeps connections for the lifetime of the pool
    pub max_lifetime: Option<u64>,
}

/// Where the migration ledger lives inside the target database
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LedgerSettings {
    #[serde(default = "default_ledger_table")]
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
}

fn default_ledger_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            table: default_ledger_table(),
            schema: None,
        }
    }
}

impl Config {
    /// Read and parse the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), settings = ?config.postgres, "configuration loaded");
        Ok(config)
    }

    /// Parse a configuration document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
