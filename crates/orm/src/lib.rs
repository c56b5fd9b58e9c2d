//! # sqlmigrate-orm: database layer for sqlmigrate
//!
//! Connects to PostgreSQL from the YAML settings and runs file-based
//! migrations tracked in a ledger table.

pub mod database;
pub mod error;
pub mod migrations;

pub use database::{connect_options, pool_options, Database};
pub use error::{OrmError, OrmResult};
pub use migrations::{
    LedgerEngine, Migration, MigrationConfig, MigrationDirection, MigrationEngine,
    MigrationManager, MigrationRunResult, MigrationRunner,
};
