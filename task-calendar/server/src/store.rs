use migration::MigratorTrait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, TransactionTrait,
};
use std::time::Duration;

use crate::retry::{RetryError, retry};

/// Default number of readiness probes made before giving up on the store.
pub const DEFAULT_READY_ATTEMPTS: u32 = 30;

const SCHEMA_LOCK_KEY: i64 = 7_316_421_880;

/// Connection settings for the task store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Delay between readiness probes.
    pub retry_delay: Duration,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Error type for store lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The connection string could not be turned into a connection pool.
    #[error("Invalid database connection settings: {0}")]
    Connection(#[source] DbErr),
    /// The store did not answer any readiness probe.
    #[error("Database unavailable after {attempts} attempt(s)")]
    Unavailable {
        attempts: u32,
        #[source]
        source: DbErr,
    },
    /// The task schema could not be created.
    #[error("Failed to create task schema: {0}")]
    Schema(#[source] DbErr),
}

impl From<RetryError<DbErr>> for StoreError {
    fn from(err: RetryError<DbErr>) -> Self {
        StoreError::Unavailable {
            attempts: err.attempts,
            source: err.source,
        }
    }
}

/// Owns the connection pool to the persistent task store.
#[derive(Debug, Clone)]
pub struct Store {
    db: DatabaseConnection,
    retry_delay: Duration,
}

impl Store {
    /// Builds the connection pool without opening any connection yet.
    #[tracing::instrument(skip(config))]
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_timeout(config.acquire_timeout)
            .connect_lazy(true)
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .map_err(StoreError::Connection)?;
        Ok(Self {
            db,
            retry_delay: config.retry_delay,
        })
    }

    /// Probes the store until it answers or `max_attempts` probes have failed.
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_ready(&self, max_attempts: u32) -> Result<(), StoreError> {
        retry(|| self.db.ping(), max_attempts, self.retry_delay).await?;
        tracing::info!("Database connection established");
        Ok(())
    }

    /// Creates the task table and its date index when they are missing.
    ///
    /// Runs under a transaction-scoped advisory lock so that processes starting
    /// at the same time apply the schema one after another. A process that does
    /// not take the lock, such as the migration binary, can still make a run fail.
    /// That failure is accepted when nothing is pending afterwards. Otherwise the
    /// run is repeated once.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        if let Err(err) = self.apply_schema().await {
            let pending = migration::Migrator::get_pending_migrations(&self.db)
                .await
                .map(|pending| pending.len());
            if completed_elsewhere(&pending) {
                tracing::warn!("Schema was completed by another process: {}", err);
            } else {
                tracing::warn!("Schema run failed, retrying once: {}", err);
                self.apply_schema().await.map_err(StoreError::Schema)?;
            }
        }
        tracing::info!("Database schema ready");
        Ok(())
    }

    async fn apply_schema(&self) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;
        let lock = format!("SELECT pg_advisory_xact_lock({SCHEMA_LOCK_KEY})");
        txn.execute_unprepared(&lock).await?;
        migration::Migrator::up(&txn, None).await?;
        txn.commit().await
    }

    /// Returns the underlying connection pool.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn into_connection(self) -> DatabaseConnection {
        self.db
    }
}

fn completed_elsewhere(pending: &Result<usize, DbErr>) -> bool {
    matches!(pending, Ok(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_accept_failed_run_when_nothing_is_pending() {
        assert!(completed_elsewhere(&Ok(0)));
    }

    #[test]
    fn can_retry_failed_run_when_migrations_remain() {
        assert!(!completed_elsewhere(&Ok(1)));
    }

    #[test]
    fn can_retry_failed_run_when_status_is_unknown() {
        let status_error = DbErr::Custom("connection reset".to_string());
        assert!(!completed_elsewhere(&Err(status_error)));
    }
}
