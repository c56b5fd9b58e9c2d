//! Migration System
//!
//! File-based migrations with paired Up/Down sections, tracked in a ledger
//! table inside the target database. Callers go through the
//! [`MigrationEngine`] trait so the execution strategy can be swapped.

pub mod definitions;
pub mod manager;
pub mod parser;
pub mod rollback;
pub mod runner;

pub use definitions::*;
pub use manager::MigrationManager;
pub use parser::{parse_migration, ParseError, ParsedMigration, MIGRATION_TEMPLATE};
pub use runner::MigrationRunner;

use async_trait::async_trait;
use sqlmigrate_core::LedgerSettings;
use std::path::Path;

use crate::database::Database;
use crate::error::OrmResult;

/// Applies or reverts the migrations found in a directory
#[async_trait]
pub trait MigrationEngine: Send + Sync {
    /// Run up to `limit` migrations in `direction` (`0` = no limit) and
    /// report what was processed
    async fn execute(
        &self,
        database: &Database,
        migrations_dir: &Path,
        direction: MigrationDirection,
        limit: usize,
    ) -> OrmResult<MigrationRunResult>;
}

/// Engine backed by [`MigrationRunner`] and a ledger table
#[derive(Debug, Clone, Default)]
pub struct LedgerEngine {
    ledger: LedgerSettings,
}

impl LedgerEngine {
    pub fn new(ledger: LedgerSettings) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl MigrationEngine for LedgerEngine {
    async fn execute(
        &self,
        database: &Database,
        migrations_dir: &Path,
        direction: MigrationDirection,
        limit: usize,
    ) -> OrmResult<MigrationRunResult> {
        let config = MigrationConfig::new(migrations_dir).with_ledger(&self.ledger);
        let runner = MigrationRunner::new(
            MigrationManager::with_config(config),
            database.pool().clone(),
        )?;

        match direction {
            MigrationDirection::Up => runner.run_migrations(limit).await,
            MigrationDirection::Down => runner.rollback_migrations(limit).await,
        }
    }
}
