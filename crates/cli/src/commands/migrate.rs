use chrono::Utc;
use sqlmigrate_core::Config;
use sqlmigrate_orm::{
    Database, LedgerEngine, MigrationDirection, MigrationEngine, MigrationManager,
    MigrationRunResult,
};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::{CommandRequest, Invocation};
use crate::error::MigrateError;

/// What a successful run did
#[derive(Debug)]
pub enum Report {
    Migrated(MigrationRunResult),
    Created(PathBuf),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Migrated(result) => match result.direction {
                MigrationDirection::Up => write!(f, "Applied {} migration(s)", result.count()),
                MigrationDirection::Down => {
                    write!(f, "Rolled back {} migration(s)", result.count())
                }
            },
            Report::Created(path) => write!(f, "Created migration: {}", path.display()),
        }
    }
}

/// Carry out a validated invocation
pub async fn run(invocation: &Invocation) -> Result<Report, MigrateError> {
    match &invocation.request {
        CommandRequest::Create { directory, name } => {
            create(directory, name, Utc::now().timestamp()).map(Report::Created)
        }
        CommandRequest::Apply { directory, limit } => {
            let result =
                connect_and_run(&invocation.config, directory, MigrationDirection::Up, *limit)
                    .await?;
            Ok(Report::Migrated(result))
        }
        CommandRequest::Rollback { directory, limit } => {
            let result = connect_and_run(
                &invocation.config,
                directory,
                MigrationDirection::Down,
                limit.get(),
            )
            .await?;
            Ok(Report::Migrated(result))
        }
    }
}

/// Write `<timestamp>_<name>.sql` into an existing directory
pub fn create(directory: &Path, name: &str, timestamp: i64) -> Result<PathBuf, MigrateError> {
    MigrationManager::new(directory)
        .create_migration(name, timestamp)
        .map_err(MigrateError::Create)
}

async fn connect_and_run(
    config_path: &Path,
    directory: &Path,
    direction: MigrationDirection,
    limit: usize,
) -> Result<MigrationRunResult, MigrateError> {
    let config = Config::load(config_path)?;
    let database = Database::connect(&config.postgres)
        .await
        .map_err(MigrateError::Connect)?;
    let engine = LedgerEngine::new(config.migrations);

    dispatch(&engine, database, directory, direction, limit).await
}

/// Hand the migration to the engine; the database is closed whatever the outcome
pub async fn dispatch(
    engine: &dyn MigrationEngine,
    database: Database,
    directory: &Path,
    direction: MigrationDirection,
    limit: usize,
) -> Result<MigrationRunResult, MigrateError> {
    let result = engine.execute(&database, directory, direction, limit).await;
    database.close().await;

    match result {
        Ok(result) => {
            tracing::info!(
                %direction,
                count = result.count(),
                elapsed_ms = result.execution_time_ms as u64,
                migrations = ?result.migrations,
                "migrations finished"
            );
            Ok(result)
        }
        Err(e) => {
            tracing::debug!(%direction, completed = e.completed(), "migration failed: {}", e);
            Err(MigrateError::Migration(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlmigrate_core::ConfigError;
    use sqlmigrate_orm::{OrmError, OrmResult};
    use sqlx::postgres::PgPoolOptions;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<(PathBuf, MigrationDirection, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl MigrationEngine for RecordingEngine {
        async fn execute(
            &self,
            _database: &Database,
            migrations_dir: &Path,
            direction: MigrationDirection,
            limit: usize,
        ) -> OrmResult<MigrationRunResult> {
            self.calls
                .lock()
                .unwrap()
                .push((migrations_dir.to_path_buf(), direction, limit));

            if self.fail {
                return Err(OrmError::InsufficientApplied {
                    requested: limit,
                    applied: 1,
                });
            }
            Ok(MigrationRunResult {
                direction,
                migrations: (0..limit).map(|i| format!("{}_m.sql", i)).collect(),
                execution_time_ms: 0,
            })
        }
    }

    fn lazy_database() -> Database {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        Database::from_pool(pool)
    }

    #[tokio::test]
    async fn test_dispatch_passes_request_through_and_closes() {
        let engine = RecordingEngine::default();
        let database = lazy_database();
        let pool = database.pool().clone();

        let result = dispatch(&engine, database, Path::new("migs"), MigrationDirection::Down, 2)
            .await
            .unwrap();

        assert_eq!(result.count(), 2);
        assert_eq!(
            engine.calls.lock().unwrap().as_slice(),
            &[(PathBuf::from("migs"), MigrationDirection::Down, 2)]
        );
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_dispatch_error_closes_and_propagates() {
        let engine = RecordingEngine {
            fail: true,
            ..Default::default()
        };
        let database = lazy_database();
        let pool = database.pool().clone();

        let err = dispatch(&engine, database, Path::new("migs"), MigrationDirection::Down, 2)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::Migration(OrmError::InsufficientApplied { .. })
        ));
        assert!(err.to_string().starts_with("migration error:"));
        assert!(pool.is_closed());
    }

    #[test]
    fn test_create_writes_single_template() {
        let temp_dir = TempDir::new().unwrap();

        let path = create(temp_dir.path(), "add_users", 1_700_000_000).unwrap();

        assert_eq!(path, temp_dir.path().join("1700000000_add_users.sql"));
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
        let content = fs::read_to_string(path).unwrap();
        let up = content.find("-- +migrate Up").unwrap();
        let down = content.find("-- +migrate Down").unwrap();
        assert!(up < down);
    }

    #[test]
    fn test_create_into_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = create(&temp_dir.path().join("nope"), "add_users", 1).unwrap_err();
        assert!(matches!(err, MigrateError::Create(OrmError::FileWrite { .. })));
        assert!(err.to_string().starts_with("create error:"));
    }

    #[tokio::test]
    async fn test_run_create_skips_config() {
        let temp_dir = TempDir::new().unwrap();
        let invocation = Invocation {
            config: temp_dir.path().join("missing.yml"),
            verbosity: 0,
            request: CommandRequest::Create {
                directory: temp_dir.path().to_path_buf(),
                name: "add_users".to_string(),
            },
        };

        let report = run(&invocation).await.unwrap();
        assert!(matches!(report, Report::Created(_)));
        assert!(report.to_string().starts_with("Created migration: "));
    }

    #[tokio::test]
    async fn test_run_apply_reports_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let invocation = Invocation {
            config: temp_dir.path().join("missing.yml"),
            verbosity: 0,
            request: CommandRequest::Apply {
                directory: temp_dir.path().to_path_buf(),
                limit: 0,
            },
        };

        let err = run(&invocation).await.unwrap_err();
        assert!(matches!(err, MigrateError::Config(ConfigError::Read { .. })));
        assert!(err.to_string().starts_with("config init error:"));
    }

    #[tokio::test]
    async fn test_run_apply_reports_bad_port_as_connect_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("config.yml");
        fs::write(
            &config,
            "postgres:\n  host: localhost\n  port: 99999\n  user: u\n  pass: p\n  dbname: d\n",
        )
        .unwrap();
        let invocation = Invocation {
            config,
            verbosity: 0,
            request: CommandRequest::Apply {
                directory: temp_dir.path().to_path_buf(),
                limit: 0,
            },
        };

        let err = run(&invocation).await.unwrap_err();
        assert!(matches!(err, MigrateError::Connect(OrmError::ConnectionOpen(_))));
        assert!(err.to_string().starts_with("db connect error:"));
    }

    #[test]
    fn test_report_wording() {
        let up = Report::Migrated(MigrationRunResult {
            direction: MigrationDirection::Up,
            migrations: vec!["1_a.sql".to_string(), "2_b.sql".to_string()],
            execution_time_ms: 3,
        });
        assert_eq!(up.to_string(), "Applied 2 migration(s)");

        let down = Report::Migrated(MigrationRunResult {
            direction: MigrationDirection::Down,
            migrations: vec!["2_b.sql".to_string()],
            execution_time_ms: 1,
        });
        assert_eq!(down.to_string(), "Rolled back 1 migration(s)");
    }
}
