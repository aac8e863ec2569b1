//! Database connection pool management.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::DbError;

/// Default maximum number of pooled connections.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default timeout when acquiring a connection from the pool.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// A thin wrapper around [`sqlx::PgPool`] with sensible defaults.
///
/// Services take the inner [`PgPool`] directly; this wrapper exists so that
/// connection setup and migrations share one entry point.
#[derive(Debug, Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    /// Connect to the database at `url` with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ConnectionFailed`] if the pool cannot be created.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        Self::connect_with_max(url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit maximum connection count.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ConnectionFailed`] if the pool cannot be created.
    pub async fn connect_with_max(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .connect(url)
            .await
            .map_err(DbError::ConnectionFailed)?;

        tracing::info!(max_connections, "Database pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests and callers that manage their
    /// own pool options).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the inner `sqlx` pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}
