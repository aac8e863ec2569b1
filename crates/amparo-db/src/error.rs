//! Error types for the amparo-db crate.
//!
//! Provides a unified error type that wraps `SQLx` errors with additional
//! context.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    ///
    /// This typically indicates network issues, invalid credentials,
    /// or the database server being unavailable.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    ///
    /// Check the migration SQL for syntax errors or constraint violations.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    /// Check if this error indicates a migration problem.
    #[must_use]
    pub fn is_migration_error(&self) -> bool {
        matches!(self, DbError::MigrationFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = DbError::ConnectionFailed(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().starts_with("Database connection failed"));
    }

    #[test]
    fn test_error_classification() {
        let err = DbError::ConnectionFailed(sqlx::Error::PoolTimedOut);
        assert!(err.is_connection_error());
        assert!(!err.is_migration_error());
    }
}
