//! Error types for connecting and migrating
//!
//! Connection failures and engine failures share one enum; the CLI decides
//! how to label them from the stage in which they occur.

use std::path::PathBuf;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database and migration operations
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// The driver rejected the connection parameters
    #[error("could not open db: {0}")]
    ConnectionOpen(String),

    /// The connection opened but the round-trip query failed
    #[error("could not test db connection: {0}")]
    ConnectionVerify(#[source] sqlx::Error),

    /// The migrations directory could not be listed or a file could not be read
    #[error("could not read migrations from {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration file does not follow the annotation format
    #[error("invalid migration {id}: {message}")]
    Parse { id: String, message: String },

    /// The ledger references a migration that has no file on disk
    #[error("unknown migration in database: {id}")]
    UnknownMigration { id: String },

    /// A rollback asked for more migrations than have been applied
    #[error("cannot roll back {requested} migration(s): only {applied} applied")]
    InsufficientApplied { requested: usize, applied: usize },

    /// The ledger table name is unusable
    #[error("invalid ledger table name: {0}")]
    LedgerName(String),

    /// Reading or creating the ledger table failed
    #[error("ledger query failed: {0}")]
    Ledger(#[source] sqlx::Error),

    /// A migration failed part-way; `completed` migrations finished before it
    #[error("migration {id} failed after {completed} completed: {source}")]
    Execution {
        id: String,
        completed: usize,
        #[source]
        source: sqlx::Error,
    },

    /// A new migration file could not be written
    #[error("could not write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrmError {
    /// Number of migrations that completed before the failure
    pub fn completed(&self) -> usize {
        match self {
            OrmError::Execution { completed, .. } => *completed,
            _ => 0,
        }
    }
}
