use sqlmigrate_core::ConfigError;
use sqlmigrate_orm::OrmError;
use thiserror::Error;

/// Problems with the command line itself; nothing has been touched yet
#[derive(Debug, Error)]
pub enum UsageError {
    /// `--help` or `--version`: clap has rendered the text to print
    #[error("{0}")]
    Display(clap::Error),

    #[error("Wrong parameters passed: {args}")]
    InvalidParameters { args: String, reason: String },

    #[error("Migration path should be passed. See -h for help")]
    MissingDirectory,

    #[error("Down migration requires number of migrations. See -h for help")]
    MissingRollbackCount,

    #[error("Migration name required. See -h for help")]
    MissingName,

    #[error("Migration name must be a plain file name, got '{0}'. See -h for help")]
    InvalidName(String),
}

impl UsageError {
    pub fn exit_code(&self) -> u8 {
        match self {
            UsageError::Display(_) => 0,
            _ => 1,
        }
    }

    /// Whether the full usage text should follow the message
    pub fn shows_usage(&self) -> bool {
        matches!(self, UsageError::InvalidParameters { .. })
    }
}

/// Failures after the command line was accepted.
///
/// `Config` covers unreadable and malformed files, `Connect` covers both
/// opening and verifying the connection.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("config init error: {0}")]
    Config(#[from] ConfigError),

    #[error("db connect error: {0}")]
    Connect(#[source] OrmError),

    #[error("migration error: {0}")]
    Migration(#[source] OrmError),

    #[error("create error: {0}")]
    Create(#[source] OrmError),
}
