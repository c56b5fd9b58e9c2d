//! Migration Rollback - Handles rolling back applied migrations
//!
//! Reverts the most recently applied migrations, executing their Down
//! statements and removing them from the ledger.

use std::collections::HashMap;
use std::time::Instant;

use super::definitions::{Migration, MigrationDirection, MigrationRecord, MigrationRunResult};
use super::runner::MigrationRunner;
use crate::error::{OrmError, OrmResult};

impl MigrationRunner {
    /// Revert exactly `limit` applied migrations; `limit == 0` reverts all.
    ///
    /// Fails before touching the database when fewer than `limit`
    /// migrations are applied.
    pub async fn rollback_migrations(&self, limit: usize) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();

        let (all_migrations, records) = self.plan().await?;
        let applied = rollback_order(&all_migrations, &records);

        if limit > applied.len() {
            return Err(OrmError::InsufficientApplied {
                requested: limit,
                applied: applied.len(),
            });
        }

        let targets = if limit == 0 {
            &applied[..]
        } else {
            &applied[..limit]
        };

        tracing::info!(
            reverting = targets.len(),
            applied = applied.len(),
            "rolling back migrations"
        );

        let mut rolled_back = Vec::new();
        for migration in targets {
            self.execute_migration(migration, MigrationDirection::Down, rolled_back.len())
                .await?;
            rolled_back.push(migration.id.clone());
        }

        Ok(MigrationRunResult {
            direction: MigrationDirection::Down,
            migrations: rolled_back,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

/// Applied migrations, most recently applied first.
///
/// Ledger rows sharing an `applied_at` fall back to reverse file order.
pub(crate) fn rollback_order<'a>(
    migrations: &'a [Migration],
    records: &[MigrationRecord],
) -> Vec<&'a Migration> {
    let by_id: HashMap<&str, (usize, &Migration)> = migrations
        .iter()
        .enumerate()
        .map(|(position, m)| (m.id.as_str(), (position, m)))
        .collect();

    let mut applied: Vec<_> = records
        .iter()
        .filter_map(|record| {
            by_id
                .get(record.id.as_str())
                .map(|&(position, m)| (record.applied_at, position, m))
        })
        .collect();
    applied.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

    applied.into_iter().map(|(_, _, m)| m).collect()
}
