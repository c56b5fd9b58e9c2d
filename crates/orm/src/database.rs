//! Database connectivity
//!
//! Builds PostgreSQL connection options from the YAML settings, opens a lazy
//! pool with the configured tuning and verifies it with a round-trip query.

use sqlmigrate_core::PostgresSettings;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;

use crate::error::{OrmError, OrmResult};

/// Open handle to the target database
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the pool and check that the server answers
    pub async fn connect(settings: &PostgresSettings) -> OrmResult<Self> {
        let database = Self::open(settings)?;
        if let Err(e) = database.verify().await {
            database.close().await;
            return Err(e);
        }

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            dbname = %settings.dbname,
            "connected to database"
        );
        Ok(database)
    }

    /// Open the pool without touching the network
    pub fn open(settings: &PostgresSettings) -> OrmResult<Self> {
        let options = connect_options(settings)?;
        let pool = pool_options(settings).connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Issue a trivial query against the server
    pub async fn verify(&self) -> OrmResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(OrmError::ConnectionVerify)?;
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection held by the pool
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("database pool closed");
    }
}

/// Connection options for the settings; TLS is disabled
pub fn connect_options(settings: &PostgresSettings) -> OrmResult<PgConnectOptions> {
    if settings.host.trim().is_empty() {
        return Err(OrmError::ConnectionOpen("host must not be empty".to_string()));
    }

    let port = u16::try_from(settings.port)
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| {
            OrmError::ConnectionOpen(format!("port {} is out of range", settings.port))
        })?;

    let mut options = PgConnectOptions::new()
        .host(&settings.host)
        .port(port)
        .username(&settings.user)
        .database(&settings.dbname)
        .ssl_mode(PgSslMode::Disable);
    if !settings.pass.is_empty() {
        options = options.password(&settings.pass);
    }

    Ok(options)
}

/// Pool options derived from the optional `connections` block
pub fn pool_options(settings: &PostgresSettings) -> PgPoolOptions {
    let mut options = PgPoolOptions::new();

    let Some(tuning) = &settings.connections else {
        return options;
    };

    if let Some(max_open) = tuning.max_open.filter(|n| *n > 0) {
        options = options.max_connections(max_open);
    }

    if let Some(max_idle) = tuning.max_idle {
        let cap = options.get_max_connections();
        options = options.min_connections(max_idle.min(cap));
    }

    if let Some(seconds) = tuning.max_lifetime {
        let lifetime = (seconds > 0).then(|| Duration::from_secs(seconds));
        options = options.max_lifetime(lifetime);
    }

    options
}
