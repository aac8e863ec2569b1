//! Family catalog model.
//!
//! Families group the children shown to sponsors. Rows are created by
//! catalog import and are immutable apart from administrative edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// A family record in the catalog.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Family {
    /// Unique identifier.
    pub id: Uuid,

    /// Number displayed to sponsors instead of the raw id.
    pub display_number: i32,

    /// When the family was imported.
    pub created_at: DateTime<Utc>,
}

impl Family {
    /// Find a family by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM families WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List families ordered by display number.
    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM families ORDER BY display_number LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Insert a family row (administrative).
    pub async fn create<'e, E>(executor: E, display_number: i32) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            INSERT INTO families (display_number)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(display_number)
        .fetch_one(executor)
        .await
    }
}
