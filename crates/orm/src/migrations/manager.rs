//! Migration Manager - File system operations for migrations
//!
//! Handles creating, loading, and parsing migration files from the filesystem.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::definitions::{Migration, MigrationConfig};
use super::parser::{parse_migration, MIGRATION_TEMPLATE};
use crate::error::{OrmError, OrmResult};

/// Migration manager for creating and loading migrations
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a manager for the given migrations directory
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(MigrationConfig::new(migrations_dir))
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// File name for a new migration created at `timestamp` (Unix seconds)
    pub fn migration_filename(name: &str, timestamp: i64) -> String {
        format!("{}_{}.sql", timestamp, name)
    }

    /// Write an empty Up/Down template into the migrations directory.
    ///
    /// The directory must already exist and an existing file is never
    /// overwritten.
    pub fn create_migration(&self, name: &str, timestamp: i64) -> OrmResult<PathBuf> {
        let filepath = self
            .config
            .migrations_dir
            .join(Self::migration_filename(name, timestamp));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = options.open(path)?;
            file.write_all(MIGRATION_TEMPLATE.as_bytes())?;
            file.sync_all()
        };

        write(&filepath).map_err(|source| OrmError::FileWrite {
            path: filepath.clone(),
            source,
        })?;

        tracing::info!(path = %filepath.display(), "migration file created");
        Ok(filepath)
    }

    /// Load all migration files from the migrations directory, in execution order
    pub fn load_migrations(&self) -> OrmResult<Vec<Migration>> {
        let dir = &self.config.migrations_dir;
        let source_error = |source| OrmError::Source {
            path: dir.clone(),
            source,
        };

        let mut migrations = Vec::new();
        for entry in fs::read_dir(dir).map_err(source_error)? {
            let path = entry.map_err(source_error)?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "sql") {
                migrations.push(self.parse_migration_file(&path)?);
            }
        }

        migrations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        tracing::debug!(count = migrations.len(), dir = %dir.display(), "migrations loaded");
        Ok(migrations)
    }

    /// Parse a migration file into a Migration struct
    fn parse_migration_file(&self, path: &Path) -> OrmResult<Migration> {
        let id = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| OrmError::Parse {
                id: path.display().to_string(),
                message: "file name is not valid UTF-8".to_string(),
            })?
            .to_string();

        let content = fs::read_to_string(path).map_err(|source| OrmError::Source {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = parse_migration(&content).map_err(|e| OrmError::Parse {
            id: id.clone(),
            message: e.to_string(),
        })?;

        Ok(Migration {
            id,
            up: parsed.up,
            down: parsed.down,
            up_no_transaction: parsed.up_no_transaction,
            down_no_transaction: parsed.down_no_transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_migration_at_fixed_time() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path());

        let path = manager.create_migration("add_users", 1_700_000_000).unwrap();
        assert_eq!(path, temp_dir.path().join("1700000000_add_users.sql"));

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "-- +migrate Up\n\n-- +migrate Down\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_created_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path());
        let path = manager.create_migration("perms", 1).unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode() & 0o777;
        // umask may only clear bits
        assert_eq!(mode & !0o644, 0);
    }

    #[test]
    fn test_create_migration_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path().join("absent"));

        let err = manager.create_migration("add_users", 1).unwrap_err();
        assert!(matches!(err, OrmError::FileWrite { .. }));
        assert!(!temp_dir.path().join("absent").exists());
    }

    #[test]
    fn test_create_migration_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path());
        let existing = temp_dir.path().join("5_taken.sql");
        fs::write(&existing, "keep me").unwrap();

        let err = manager.create_migration("taken", 5).unwrap_err();
        assert!(matches!(err, OrmError::FileWrite { .. }));
        assert_eq!(fs::read_to_string(existing).unwrap(), "keep me");
    }

    #[test]
    fn test_created_migration_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path());
        manager.create_migration("add_users", 1_700_000_000).unwrap();

        let migrations = manager.load_migrations().unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].id, "1700000000_add_users.sql");
        assert!(migrations[0].up.is_empty());
        assert!(migrations[0].down.is_empty());
    }

    #[test]
    fn test_load_migrations_ordering_and_filtering() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path());

        fs::write(
            temp_dir.path().join("10_posts.sql"),
            "-- +migrate Up\nCREATE TABLE posts (id INT);\n-- +migrate Down\nDROP TABLE posts;\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("9_users.sql"),
            "-- +migrate Up\nCREATE TABLE users (id INT);\n-- +migrate Down\nDROP TABLE users;\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("README.md"), "not a migration").unwrap();
        fs::create_dir(temp_dir.path().join("archive.sql")).unwrap();

        let migrations = manager.load_migrations().unwrap();
        let ids: Vec<_> = migrations.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["9_users.sql", "10_posts.sql"]);
        assert_eq!(migrations[0].up, vec!["CREATE TABLE users (id INT);"]);
        assert_eq!(migrations[1].down, vec!["DROP TABLE posts;"]);
    }

    #[test]
    fn test_load_migrations_reports_bad_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path());
        fs::write(temp_dir.path().join("1_plain.sql"), "CREATE TABLE t (id INT);\n").unwrap();

        match manager.load_migrations().unwrap_err() {
            OrmError::Parse { id, message } => {
                assert_eq!(id, "1_plain.sql");
                assert!(message.contains("no Up/Down annotations"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_migrations_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(temp_dir.path().join("absent"));
        assert!(matches!(
            manager.load_migrations(),
            Err(OrmError::Source { .. })
        ));
    }
}
