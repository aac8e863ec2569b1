//! Single-child claim ledger model.
//!
//! A claim records one sponsor's request for exactly one child. The owning
//! child's `status` must mirror the claim's status at every moment; the
//! engine enforces that by pairing every claim transition here with a
//! guarded child transition in the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// Status for single-child claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "claim_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Submitted, awaiting administrative confirmation.
    Pending,
    /// Confirmed by an administrator.
    Confirmed,
    /// Sponsorship fulfilled.
    Completed,
    /// Cancelled (administratively or by the sweep).
    Cancelled,
}

impl ClaimStatus {
    /// Whether the claim still holds its child.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether the claim is in a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Sponsor gift preference, fixed at claim submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gift_preference", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GiftPreference {
    /// A toy.
    Toy,
    /// Clothing.
    Clothing,
    /// Books.
    Books,
    /// A monetary donation.
    Money,
    /// No preference.
    Any,
}

/// A single-child claim ledger row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier. Generated by the engine before the row is
    /// inserted so the child's hold back-reference can point at it.
    pub id: Uuid,

    /// The claimed child.
    pub child_id: Uuid,

    /// Sponsor display name.
    pub sponsor_name: String,

    /// Sponsor contact email.
    pub sponsor_email: String,

    /// Optional sponsor phone number.
    pub sponsor_phone: Option<String>,

    /// Optional free-text message from the sponsor.
    pub sponsor_message: Option<String>,

    /// Gift preference.
    pub gift_preference: GiftPreference,

    /// Claim lifecycle status.
    pub status: ClaimStatus,

    /// When the sponsor submitted the request.
    pub request_date: DateTime<Utc>,

    /// When an administrator confirmed the claim.
    pub confirmation_date: Option<DateTime<Utc>>,

    /// When the sponsorship was fulfilled.
    pub completion_date: Option<DateTime<Utc>>,

    /// Free-text administrative notes (cancellation reasons land here).
    pub admin_notes: Option<String>,
}

/// Input for inserting a new claim row.
#[derive(Debug, Clone)]
pub struct CreateClaim {
    /// Pre-generated claim id (also the child's hold back-reference).
    pub id: Uuid,
    /// The claimed child.
    pub child_id: Uuid,
    /// Sponsor display name.
    pub sponsor_name: String,
    /// Sponsor contact email.
    pub sponsor_email: String,
    /// Optional sponsor phone number.
    pub sponsor_phone: Option<String>,
    /// Optional free-text message.
    pub sponsor_message: Option<String>,
    /// Gift preference.
    pub gift_preference: GiftPreference,
}

/// Filter options for listing claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimFilter {
    /// Restrict to one lifecycle status.
    pub status: Option<ClaimStatus>,
    /// Restrict to claims on one child.
    pub child_id: Option<Uuid>,
}

impl Claim {
    /// Insert a new claim row with status `pending`.
    pub async fn create<'e, E>(executor: E, input: CreateClaim) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            INSERT INTO claims (
                id, child_id, sponsor_name, sponsor_email,
                sponsor_phone, sponsor_message, gift_preference
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(input.id)
        .bind(input.child_id)
        .bind(&input.sponsor_name)
        .bind(&input.sponsor_email)
        .bind(&input.sponsor_phone)
        .bind(&input.sponsor_message)
        .bind(input.gift_preference)
        .fetch_one(executor)
        .await
    }

    /// Find a claim by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM claims WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List claims with filtering and pagination, newest first.
    pub async fn list<'e, E>(
        executor: E,
        filter: &ClaimFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("SELECT * FROM claims WHERE TRUE");
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.child_id.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND child_id = ${param_count}"));
        }

        query.push_str(&format!(
            " ORDER BY request_date DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        ));

        let mut q = sqlx::query_as::<_, Claim>(&query);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(child_id) = filter.child_id {
            q = q.bind(child_id);
        }

        q.bind(limit).bind(offset).fetch_all(executor).await
    }

    /// Count claims matching a filter.
    pub async fn count<'e, E>(executor: E, filter: &ClaimFilter) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("SELECT COUNT(*) FROM claims WHERE TRUE");
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.child_id.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND child_id = ${param_count}"));
        }

        let mut q = sqlx::query_scalar::<_, i64>(&query);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(child_id) = filter.child_id {
            q = q.bind(child_id);
        }

        q.fetch_one(executor).await
    }

    /// Guarded `pending` -> `confirmed`, stamping the confirmation date.
    /// Returns `None` if the claim is missing or not pending.
    pub async fn try_confirm<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE claims
            SET status = 'confirmed', confirmation_date = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Guarded `confirmed` -> `completed`, stamping the completion date.
    pub async fn try_complete<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE claims
            SET status = 'completed', completion_date = NOW()
            WHERE id = $1 AND status = 'confirmed'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Guarded cancel from any active state, appending the reason to the
    /// admin notes.
    pub async fn try_cancel<'e, E>(
        executor: E,
        id: Uuid,
        reason: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE claims
            SET status = 'cancelled',
                admin_notes = TRIM(COALESCE(admin_notes || E'\n', '') || $2)
            WHERE id = $1 AND status IN ('pending', 'confirmed')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(executor)
        .await
    }

    /// Sweep-only cancel: `pending` -> `cancelled`, re-conditioned on the
    /// request date still being stale. A claim confirmed between the
    /// sweep's read and this write is left alone; returns `None` in that
    /// case.
    pub async fn try_expire_pending<'e, E>(
        executor: E,
        id: Uuid,
        cutoff: DateTime<Utc>,
        reason: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE claims
            SET status = 'cancelled',
                admin_notes = TRIM(COALESCE(admin_notes || E'\n', '') || $3)
            WHERE id = $1 AND status = 'pending' AND request_date <= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(cutoff)
        .bind(reason)
        .fetch_optional(executor)
        .await
    }

    /// Pending claims whose request date is at or before `cutoff`, oldest
    /// first. Sweep candidates; the cancel itself stays guarded.
    pub async fn find_stale_pending<'e, E>(
        executor: E,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            SELECT * FROM claims
            WHERE status = 'pending' AND request_date <= $1
            ORDER BY request_date ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_active() {
        assert!(ClaimStatus::Pending.is_active());
        assert!(ClaimStatus::Confirmed.is_active());
        assert!(!ClaimStatus::Completed.is_active());
        assert!(!ClaimStatus::Cancelled.is_active());
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(ClaimStatus::Completed.is_terminal());
        assert!(ClaimStatus::Cancelled.is_terminal());
        assert!(!ClaimStatus::Pending.is_terminal());
        assert!(!ClaimStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_active_and_terminal_partition() {
        for status in [
            ClaimStatus::Pending,
            ClaimStatus::Confirmed,
            ClaimStatus::Completed,
            ClaimStatus::Cancelled,
        ] {
            assert_ne!(status.is_active(), status.is_terminal());
        }
    }

    #[test]
    fn test_gift_preference_serialization() {
        let json = serde_json::to_string(&GiftPreference::Clothing).unwrap();
        assert_eq!(json, "\"clothing\"");
        let back: GiftPreference = serde_json::from_str("\"any\"").unwrap();
        assert_eq!(back, GiftPreference::Any);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ClaimStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
