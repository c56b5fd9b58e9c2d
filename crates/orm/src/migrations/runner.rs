//! Migration Runner - Executes migrations against the database
//!
//! Handles the actual execution of migrations and tracks applied migrations
//! in the ledger table.

use sqlx::postgres::{PgConnection, PgPool};
use sqlx::{Executor, Row};
use std::collections::HashSet;
use std::time::Instant;

use super::definitions::{Migration, MigrationDirection, MigrationRecord, MigrationRunResult};
use super::manager::MigrationManager;
use crate::error::{OrmError, OrmResult};

/// Migration runner that executes migrations against a database
pub struct MigrationRunner {
    manager: MigrationManager,
    pool: PgPool,
    ledger: String,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(manager: MigrationManager, pool: PgPool) -> OrmResult<Self> {
        let config = manager.config();
        let ledger = ledger_table_name(
            &config.migrations_table,
            config.migrations_schema.as_deref(),
        )?;

        Ok(Self {
            manager,
            pool,
            ledger,
        })
    }

    /// Apply pending migrations in order; `limit == 0` applies all of them
    pub async fn run_migrations(&self, limit: usize) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();

        let (all_migrations, records) = self.plan().await?;
        let applied_ids: HashSet<&str> = records.iter().map(|record| record.id.as_str()).collect();

        let pending: Vec<&Migration> = all_migrations
            .iter()
            .filter(|m| !applied_ids.contains(m.id.as_str()))
            .take(if limit == 0 { usize::MAX } else { limit })
            .collect();

        tracing::info!(
            pending = pending.len(),
            applied = applied_ids.len(),
            "applying migrations"
        );

        let mut applied = Vec::new();
        for migration in pending {
            self.execute_migration(migration, MigrationDirection::Up, applied.len())
                .await?;
            applied.push(migration.id.clone());
        }

        Ok(MigrationRunResult {
            direction: MigrationDirection::Up,
            migrations: applied,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Load files and ledger, rejecting ledger entries with no file on disk
    pub(crate) async fn plan(&self) -> OrmResult<(Vec<Migration>, Vec<MigrationRecord>)> {
        let all_migrations = self.manager.load_migrations()?;

        self.ensure_migrations_table().await?;
        let records = self.get_applied_migrations().await?;

        let known: HashSet<&str> = all_migrations.iter().map(|m| m.id.as_str()).collect();
        if let Some(unknown) = records.iter().find(|r| !known.contains(r.id.as_str())) {
            return Err(OrmError::UnknownMigration {
                id: unknown.id.clone(),
            });
        }

        Ok((all_migrations, records))
    }

    /// Run one migration in `direction` and update the ledger.
    ///
    /// Inside a transaction unless the section is marked `notransaction`.
    pub(crate) async fn execute_migration(
        &self,
        migration: &Migration,
        direction: MigrationDirection,
        completed: usize,
    ) -> OrmResult<()> {
        let failed = |source| OrmError::Execution {
            id: migration.id.clone(),
            completed,
            source,
        };

        tracing::info!(id = %migration.id, %direction, "running migration");

        if migration.runs_in_transaction(direction) {
            let mut transaction = self.pool.begin().await.map_err(failed)?;
            self.run_statements(&mut *transaction, migration, direction)
                .await
                .map_err(failed)?;
            transaction.commit().await.map_err(failed)?;
        } else {
            let mut connection = self.pool.acquire().await.map_err(failed)?;
            self.run_statements(&mut *connection, migration, direction)
                .await
                .map_err(failed)?;
        }

        Ok(())
    }

    async fn run_statements(
        &self,
        conn: &mut PgConnection,
        migration: &Migration,
        direction: MigrationDirection,
    ) -> Result<(), sqlx::Error> {
        for statement in migration.statements(direction) {
            tracing::debug!(id = %migration.id, "{}", statement);
            (&mut *conn).execute(statement.as_str()).await?;
        }

        let ledger_sql = match direction {
            MigrationDirection::Up => self.record_migration_sql(),
            MigrationDirection::Down => self.remove_migration_sql(),
        };
        sqlx::query(&ledger_sql)
            .bind(&migration.id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Ensure migrations table exists
    async fn ensure_migrations_table(&self) -> OrmResult<()> {
        if let Some(schema) = &self.manager.config().migrations_schema {
            let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema));
            self.pool.execute(sql.as_str()).await.map_err(OrmError::Ledger)?;
        }

        let sql = self.create_migrations_table_sql();
        self.pool.execute(sql.as_str()).await.map_err(OrmError::Ledger)?;
        Ok(())
    }

    /// Get applied migrations from database, oldest first
    pub async fn get_applied_migrations(&self) -> OrmResult<Vec<MigrationRecord>> {
        let sql = self.get_applied_migrations_sql();
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(OrmError::Ledger)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(MigrationRecord {
                id: row.try_get("id").map_err(OrmError::Ledger)?,
                applied_at: row.try_get("applied_at").map_err(OrmError::Ledger)?,
            });
        }

        Ok(records)
    }

    /// SQL to create the migrations tracking table
    fn create_migrations_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id TEXT NOT NULL PRIMARY KEY,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()\n\
            )",
            self.ledger
        )
    }

    /// SQL to record a migration as applied
    fn record_migration_sql(&self) -> String {
        format!("INSERT INTO {} (id, applied_at) VALUES ($1, now())", self.ledger)
    }

    /// SQL to remove a migration record (for rollback)
    fn remove_migration_sql(&self) -> String {
        format!("DELETE FROM {} WHERE id = $1", self.ledger)
    }

    /// SQL to get applied migrations
    fn get_applied_migrations_sql(&self) -> String {
        format!(
            "SELECT id, applied_at FROM {} ORDER BY applied_at ASC, id ASC",
            self.ledger
        )
    }
}

/// Quote a PostgreSQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the quoted ledger table reference
pub(crate) fn ledger_table_name(table: &str, schema: Option<&str>) -> OrmResult<String> {
    if table.trim().is_empty() {
        return Err(OrmError::LedgerName("table name is empty".to_string()));
    }
    if table.contains('\0') || schema.map_or(false, |s| s.contains('\0')) {
        return Err(OrmError::LedgerName(table.to_string()));
    }

    Ok(match schema.filter(|s| !s.trim().is_empty()) {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    })
}
