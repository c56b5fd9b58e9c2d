pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LedgerSettings, PoolSettings, PostgresSettings, DEFAULT_CONFIG_PATH, DEFAULT_LEDGER_TABLE};
pub use error::ConfigError;
pub use logging::{init_logging, LoggingConfig};
