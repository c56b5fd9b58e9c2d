//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system including
//! Migration, MigrationRecord, and MigrationConfig structures.

use chrono::{DateTime, Utc};
use sqlmigrate_core::{LedgerSettings, DEFAULT_LEDGER_TABLE};
use std::path::PathBuf;

/// A parsed migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// File name, used as the ledger key (e.g. `1700000000_add_users.sql`)
    pub id: String,
    /// Statements run when applying
    pub up: Vec<String>,
    /// Statements run when reverting
    pub down: Vec<String>,
    pub up_no_transaction: bool,
    pub down_no_transaction: bool,
}

impl Migration {
    /// Statements for the given direction
    pub fn statements(&self, direction: MigrationDirection) -> &[String] {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }

    /// Whether the given direction runs inside a transaction
    pub fn runs_in_transaction(&self, direction: MigrationDirection) -> bool {
        match direction {
            MigrationDirection::Up => !self.up_no_transaction,
            MigrationDirection::Down => !self.down_no_transaction,
        }
    }

    /// Leading numeric part of the file name, if any
    pub fn version(&self) -> Option<u64> {
        let digits: &str = &self.id[..self
            .id
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.id.len())];
        digits.parse().ok()
    }

    /// Ordering key: numbered migrations first by number, then the rest by name
    pub(crate) fn sort_key(&self) -> (u8, u64, &str) {
        match self.version() {
            Some(version) => (0, version, self.id.as_str()),
            None => (1, 0, self.id.as_str()),
        }
    }
}

/// A row of the ledger table
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    /// Migration ID
    pub id: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
    /// Schema holding the tracking table, when not the search path default
    pub migrations_schema: Option<String>,
}

impl MigrationConfig {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            ..Self::default()
        }
    }

    /// Take the ledger location from the YAML settings
    pub fn with_ledger(mut self, ledger: &LedgerSettings) -> Self {
        self.migrations_table = ledger.table.clone();
        self.migrations_schema = ledger.schema.clone();
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: DEFAULT_LEDGER_TABLE.to_string(),
            migrations_schema: None,
        }
    }
}

/// Result of running migrations in either direction
#[derive(Debug)]
pub struct MigrationRunResult {
    pub direction: MigrationDirection,
    /// IDs of migrations that were applied or reverted, in execution order
    pub migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    /// Number of migrations processed
    pub fn count(&self) -> usize {
        self.migrations.len()
    }
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run UP statements)
    Up,
    /// Rollback the migration (run DOWN statements)
    Down,
}

impl std::fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}
