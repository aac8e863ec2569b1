//! Child catalog model and the guarded transition primitive.
//!
//! `children.status` is the ground truth for availability. Both claim
//! pathways (single-child claims and multi-child reservations), the
//! administrative operations, and the sweep jobs all mutate it exclusively
//! through the guarded helpers below: a single conditional `UPDATE` whose
//! `WHERE` clause names the expected prior state, with success reported as
//! `rows_affected == 1`. Zero affected rows means another request changed
//! the state first; callers must treat that as authoritative, never retry
//! blindly and never ignore it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// Availability status for a child.
///
/// `Completed` and `Confirmed` both read as "sponsored" to the public
/// catalog; the distinction only matters to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "child_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChildStatus {
    /// Open for claiming.
    Available,
    /// Held by an in-flight claim or reservation.
    Pending,
    /// Sponsorship confirmed.
    Confirmed,
    /// Sponsorship fulfilled.
    Completed,
    /// Withdrawn from the catalog.
    Inactive,
}

impl ChildStatus {
    /// Whether a new hold may be placed on a child in this status.
    #[must_use]
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Whether the child is currently held by an active claim/reservation.
    #[must_use]
    pub fn is_held(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// A child record in the catalog.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Child {
    /// Unique identifier.
    pub id: Uuid,

    /// The owning family.
    pub family_id: Uuid,

    /// Per-family slot letter (A, B, C, ...).
    pub slot_letter: String,

    /// Authoritative availability flag.
    pub status: ChildStatus,

    /// Back-reference to the active hold (a claim id or a reservation id).
    /// A lookup key, not ownership.
    pub reservation_id: Option<Uuid>,

    /// When the active hold lapses, if any.
    pub reservation_expires_at: Option<DateTime<Utc>>,

    /// When the child was imported.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Child {
    /// Find a child by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM children WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Fetch a set of children by ID. Order is unspecified; callers that
    /// need a stable order re-sort against their own id list.
    pub async fn find_by_ids<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM children WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// List children in a family ordered by slot letter.
    pub async fn list_by_family<'e, E>(
        executor: E,
        family_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM children WHERE family_id = $1 ORDER BY slot_letter")
            .bind(family_id)
            .fetch_all(executor)
            .await
    }

    /// Guarded quick-reserve hold: `available` -> `pending` with an expiry
    /// stamp but no ledger back-reference yet. Holds left in this state are
    /// reclaimed by the orphan phase of the claim sweep once the expiry
    /// passes.
    pub async fn try_quick_hold<'e, E>(
        executor: E,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET status = 'pending',
                reservation_expires_at = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'available'
            "#,
        )
        .bind(id)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Release pending holds that never acquired a ledger back-reference
    /// and whose expiry has passed (quick-reserves abandoned before a claim
    /// row was written). Returns the number of children freed.
    pub async fn release_expired_orphans<'e, E>(
        executor: E,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET status = 'available',
                reservation_expires_at = NULL,
                updated_at = NOW()
            WHERE status = 'pending'
              AND reservation_id IS NULL
              AND reservation_expires_at IS NOT NULL
              AND reservation_expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Guarded hold: `available` -> `pending`, recording the hold's id and
    /// expiry on the row in the same statement.
    pub async fn try_hold<'e, E>(
        executor: E,
        id: Uuid,
        hold_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET status = 'pending',
                reservation_id = $2,
                reservation_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'available'
            "#,
        )
        .bind(id)
        .bind(hold_id)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Guarded release: `pending` -> `available`, conditioned on the hold
    /// back-reference still matching `hold_id`.
    ///
    /// The condition makes releases idempotent and sweep-safe: a child
    /// picked up by a new claim between a sweep's read and its write no
    /// longer carries this `hold_id` and is left alone.
    pub async fn try_release<'e, E>(
        executor: E,
        id: Uuid,
        hold_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET status = 'available',
                reservation_id = NULL,
                reservation_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND reservation_id = $2
            "#,
        )
        .bind(id)
        .bind(hold_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Guarded confirmation: `pending` -> `confirmed`, conditioned on the
    /// hold back-reference.
    pub async fn try_confirm_held<'e, E>(
        executor: E,
        id: Uuid,
        hold_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET status = 'confirmed',
                reservation_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND reservation_id = $2
            "#,
        )
        .bind(id)
        .bind(hold_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Administrative release to `available` from any status.
    ///
    /// Still conditioned on the back-reference so a stale administrative
    /// cancel cannot clobber a newer hold on the same child.
    pub async fn force_release<'e, E>(
        executor: E,
        id: Uuid,
        hold_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE children
            SET status = 'available',
                reservation_id = NULL,
                reservation_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND reservation_id = $2
            "#,
        )
        .bind(id)
        .bind(hold_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_available() {
        assert!(ChildStatus::Available.is_available());
        assert!(!ChildStatus::Pending.is_available());
        assert!(!ChildStatus::Confirmed.is_available());
        assert!(!ChildStatus::Completed.is_available());
        assert!(!ChildStatus::Inactive.is_available());
    }

    #[test]
    fn test_status_is_held() {
        assert!(ChildStatus::Pending.is_held());
        assert!(ChildStatus::Confirmed.is_held());
        assert!(!ChildStatus::Available.is_held());
        assert!(!ChildStatus::Completed.is_held());
        assert!(!ChildStatus::Inactive.is_held());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ChildStatus::Available).unwrap();
        assert_eq!(json, "\"available\"");
        let back: ChildStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, ChildStatus::Pending);
    }
}
