//! Multi-child reservation ledger model.
//!
//! A reservation is a token-addressable hold over one or more children with
//! an explicit expiration. Only the SHA-256 hash of the bearer token is
//! stored; lookups hash the presented token. Expiry is always computed
//! against the caller-supplied clock, never read back from a cached flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// Status for multi-child reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Held, awaiting sponsor confirmation.
    Pending,
    /// Confirmed by the sponsor.
    Confirmed,
    /// Cancelled by the sponsor or an administrator.
    Cancelled,
    /// Reclaimed by the sweep after the hold lapsed.
    Expired,
}

impl ReservationStatus {
    /// Whether the reservation still holds its children.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether the reservation is in a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }
}

/// A multi-child reservation ledger row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier. Generated by the engine before the row is
    /// inserted so the children's hold back-references can point at it.
    pub id: Uuid,

    /// SHA-256 hash of the bearer token (hex). Never the plaintext.
    pub token_hash: String,

    /// Sponsor display name.
    pub sponsor_name: String,

    /// Sponsor contact email.
    pub sponsor_email: String,

    /// Optional sponsor phone number.
    pub sponsor_phone: Option<String>,

    /// The reserved children, in submission order.
    pub children_ids: Vec<Uuid>,

    /// Denormalized count of `children_ids`.
    pub total_children: i32,

    /// Reservation lifecycle status.
    pub status: ReservationStatus,

    /// When the hold lapses if not confirmed.
    pub expires_at: DateTime<Utc>,

    /// When the sponsor confirmed, if they did.
    pub confirmed_at: Option<DateTime<Utc>>,

    /// When the reservation was cancelled, if it was.
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Request origin address, for audit.
    pub origin_ip: Option<String>,

    /// Request client string, for audit.
    pub user_agent: Option<String>,

    /// When the reservation was created.
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the hold has lapsed as of `now`.
    ///
    /// Only pending reservations expire; confirmed ones are kept by the
    /// sponsor and terminal ones are already settled.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Pending && self.expires_at <= now
    }
}

/// Input for inserting a new reservation row.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    /// Pre-generated reservation id (also the children's hold
    /// back-reference).
    pub id: Uuid,
    /// SHA-256 hash of the bearer token.
    pub token_hash: String,
    /// Sponsor display name.
    pub sponsor_name: String,
    /// Sponsor contact email.
    pub sponsor_email: String,
    /// Optional sponsor phone number.
    pub sponsor_phone: Option<String>,
    /// The reserved children, in submission order.
    pub children_ids: Vec<Uuid>,
    /// When the hold lapses.
    pub expires_at: DateTime<Utc>,
    /// Request origin address, for audit.
    pub origin_ip: Option<String>,
    /// Request client string, for audit.
    pub user_agent: Option<String>,
}

impl Reservation {
    /// Insert a new reservation row with status `pending`.
    pub async fn create<'e, E>(executor: E, input: CreateReservation) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let total = i32::try_from(input.children_ids.len()).unwrap_or(i32::MAX);

        sqlx::query_as(
            r#"
            INSERT INTO reservations (
                id, token_hash, sponsor_name, sponsor_email, sponsor_phone,
                children_ids, total_children, expires_at, origin_ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(input.id)
        .bind(&input.token_hash)
        .bind(&input.sponsor_name)
        .bind(&input.sponsor_email)
        .bind(&input.sponsor_phone)
        .bind(&input.children_ids)
        .bind(total)
        .bind(input.expires_at)
        .bind(&input.origin_ip)
        .bind(&input.user_agent)
        .fetch_one(executor)
        .await
    }

    /// Find a reservation by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a reservation by the hash of a presented bearer token.
    pub async fn find_by_token_hash<'e, E>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM reservations WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(executor)
            .await
    }

    /// Token-hash lookup with row-level locking.
    ///
    /// Uses `FOR UPDATE` so concurrent confirm/cancel attempts on the same
    /// token serialize instead of racing past the status checks.
    pub async fn find_by_token_hash_for_update<'e, E>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM reservations WHERE token_hash = $1 FOR UPDATE")
            .bind(token_hash)
            .fetch_optional(executor)
            .await
    }

    /// ID lookup with row-level locking, for administrative operations.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Guarded `pending` -> `confirmed`, refusing lapsed holds in the same
    /// statement. Returns `None` if the row is missing, not pending, or
    /// already past `now`.
    pub async fn try_confirm<'e, E>(
        executor: E,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE reservations
            SET status = 'confirmed', confirmed_at = $2
            WHERE id = $1 AND status = 'pending' AND expires_at > $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(executor)
        .await
    }

    /// Guarded `pending` -> `cancelled` (self-service path).
    pub async fn try_cancel<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE reservations
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Guarded cancel from any active state (administrative path).
    pub async fn try_cancel_admin<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE reservations
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'confirmed')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Guarded `pending` -> `expired`, conditioned on the expiry still
    /// being in the past. Returns `None` if someone confirmed or cancelled
    /// the reservation between the sweep's read and this write.
    pub async fn try_expire<'e, E>(
        executor: E,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            UPDATE reservations
            SET status = 'expired'
            WHERE id = $1 AND status = 'pending' AND expires_at <= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(executor)
        .await
    }

    /// Pending reservations whose expiry is at or before `now`, oldest
    /// first. Sweep candidates; the expire itself stays guarded.
    pub async fn find_expired_pending<'e, E>(
        executor: E,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            SELECT * FROM reservations
            WHERE status = 'pending' AND expires_at <= $1
            ORDER BY expires_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reservation(status: ReservationStatus, expires_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            token_hash: "ab".repeat(32),
            sponsor_name: "Jordan Rivera".to_string(),
            sponsor_email: "jordan@example.com".to_string(),
            sponsor_phone: None,
            children_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            total_children: 2,
            status,
            expires_at,
            confirmed_at: None,
            cancelled_at: None,
            origin_ip: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_pending_past_expiry_is_expired() {
        let now = Utc::now();
        let res = reservation(ReservationStatus::Pending, now - Duration::minutes(1));
        assert!(res.is_expired(now));
    }

    #[test]
    fn test_pending_before_expiry_is_not_expired() {
        let now = Utc::now();
        let res = reservation(ReservationStatus::Pending, now + Duration::hours(1));
        assert!(!res.is_expired(now));
    }

    #[test]
    fn test_expiry_is_computed_not_cached() {
        // The same row reads as live or lapsed depending only on the clock
        // handed in; there is no stored flag to go stale.
        let expires = Utc::now();
        let res = reservation(ReservationStatus::Pending, expires);
        assert!(!res.is_expired(expires - Duration::seconds(1)));
        assert!(res.is_expired(expires + Duration::seconds(1)));
    }

    #[test]
    fn test_non_pending_never_expires() {
        let now = Utc::now();
        let past = now - Duration::hours(2);
        for status in [
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            assert!(!reservation(status, past).is_expired(now));
        }
    }

    #[test]
    fn test_status_partition() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::Confirmed.is_active());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ReservationStatus::Expired).unwrap();
        assert_eq!(json, "\"expired\"");
    }
}
