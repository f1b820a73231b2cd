//! PostgreSQL pool shared by every dmplan repository.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use dmplan_core::error::{StorageError, StorageResult};

/// URL used when none is configured.
const DEFAULT_DATABASE_URL: &str = "postgres://localhost/dmplan";

/// Pool settings for the API server.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Connections kept warm between bursts of searches.
    pub min_connections: u32,
    /// How long a request waits for a free connection before failing.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::for_api(DEFAULT_DATABASE_URL)
    }
}

impl DatabaseConfig {
    /// Pool sized for the API server.
    ///
    /// Each paginated search holds two connections at once (page and count),
    /// and a relationship mutation holds one per id applied. A short acquire
    /// timeout turns pool exhaustion into a fast storage error.
    pub fn for_api(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(900),
        }
    }
}

/// Connection pool plus the dmplan schema migrations.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool described by `config`.
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        debug!(
            max_conn = config.max_connections,
            min_conn = config.min_connections,
            acquire_timeout_secs = config.acquire_timeout.as_secs(),
            "Opening API connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Pool handed to the repositories.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the reference, template, project and join-table schema.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        debug!("Schema up to date");
        Ok(())
    }

    /// Close the pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: le pool API garde de la marge pour page + count concurrents
    #[test]
    fn test_api_config_sizing() {
        let config = DatabaseConfig::for_api("postgres://db/dmplan");
        assert_eq!(config.url, "postgres://db/dmplan");
        assert!(config.max_connections >= 2 * config.min_connections);
        assert!(config.acquire_timeout <= Duration::from_secs(5));
    }

    #[test]
    fn test_default_is_local_api_pool() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, DEFAULT_DATABASE_URL);
        assert_eq!(
            config.max_connections,
            DatabaseConfig::for_api("x").max_connections
        );
    }
}
