//! Multi-child reservation workflow.
//!
//! Reservations are token-addressable holds over one or more children.
//! Creation is all-or-nothing: every child's guarded hold runs in one
//! transaction and a single zero-row update aborts the whole call, rolling
//! back the holds already taken. Confirm/cancel/expire re-check state
//! fresh, under a row lock on the reservation.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use amparo_core::{ChildId, ReservationId};
use amparo_db::models::{Child, ChildStatus, CreateReservation, Reservation, ReservationStatus};

use crate::config::EngineConfig;
use crate::error::{ConflictReason, EngineError, Result};
use crate::notify::{dispatch, NotificationEvent, Notifier};
use crate::token::{generate_token, hash_token, redact_token};
use crate::validation::{validate_sponsor_info, SponsorInfo};

/// Request metadata recorded for audit.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Origin address of the request.
    pub origin_ip: Option<String>,
    /// Client string of the request.
    pub user_agent: Option<String>,
}

/// A child that failed the availability pre-check.
#[derive(Debug, Clone)]
pub struct UnavailableChild {
    /// The requested child.
    pub child_id: uuid::Uuid,
    /// Its current status, or `None` if the id is unknown.
    pub status: Option<ChildStatus>,
}

/// Result of the read-only availability pre-check.
///
/// Advisory only: the claiming transaction re-verifies every child through
/// its guarded holds.
#[derive(Debug, Clone)]
pub struct AvailabilityReport {
    /// How many children were asked about.
    pub requested: usize,
    /// The subset that cannot currently be reserved.
    pub unavailable: Vec<UnavailableChild>,
}

impl AvailabilityReport {
    /// Whether every requested child was available at read time.
    #[must_use]
    pub fn is_all_available(&self) -> bool {
        self.unavailable.is_empty()
    }
}

/// A freshly created reservation together with its bearer token.
///
/// The token appears here and in the notification event, and nowhere else.
#[derive(Debug, Clone)]
pub struct CreatedReservation {
    /// The persisted reservation.
    pub reservation: Reservation,
    /// The plaintext bearer token; not recoverable later.
    pub token: String,
}

/// A reservation hydrated with its children, as returned to token holders.
#[derive(Debug, Clone)]
pub struct ReservationDetails {
    /// The reservation row.
    pub reservation: Reservation,
    /// The reserved children, in submission order.
    pub children: Vec<Child>,
    /// Whether the hold has lapsed, computed against the current clock.
    pub is_expired: bool,
}

/// Service for multi-child, token-addressable reservations.
pub struct ReservationService {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl ReservationService {
    /// Create a new reservation service.
    #[must_use]
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        Self {
            pool,
            notifier,
            config,
        }
    }

    /// Read-only pre-check: which of `child_ids` cannot be reserved right
    /// now. Unknown ids are reported as unavailable with no status.
    pub async fn check_availability(&self, child_ids: &[ChildId]) -> Result<AvailabilityReport> {
        let ids: Vec<uuid::Uuid> = child_ids.iter().map(|c| c.into_uuid()).collect();
        let found = Child::find_by_ids(&self.pool, &ids).await?;

        let by_id: HashMap<uuid::Uuid, &Child> = found.iter().map(|c| (c.id, c)).collect();

        let unavailable = ids
            .iter()
            .filter_map(|id| match by_id.get(id) {
                Some(child) if child.status.is_available() => None,
                Some(child) => Some(UnavailableChild {
                    child_id: *id,
                    status: Some(child.status),
                }),
                None => Some(UnavailableChild {
                    child_id: *id,
                    status: None,
                }),
            })
            .collect();

        Ok(AvailabilityReport {
            requested: ids.len(),
            unavailable,
        })
    }

    /// Create a reservation over `child_ids` with a TTL of `ttl_hours`
    /// (config default when `None`).
    ///
    /// All-or-nothing: the reservation insert and every child's guarded
    /// hold run in one transaction; any child that cannot be held aborts
    /// the whole call and rolls back the holds already taken.
    ///
    /// Returns the bearer token exactly once.
    #[instrument(skip(self, info, meta), fields(children = child_ids.len()))]
    pub async fn create_reservation(
        &self,
        info: SponsorInfo,
        child_ids: &[ChildId],
        ttl_hours: Option<i64>,
        meta: RequestMeta,
    ) -> Result<CreatedReservation> {
        if child_ids.is_empty() {
            return Err(EngineError::Validation(
                "At least one child must be selected".to_string(),
            ));
        }
        if child_ids.len() > self.config.max_children_per_reservation {
            return Err(EngineError::Validation(format!(
                "A reservation may hold at most {} children",
                self.config.max_children_per_reservation
            )));
        }
        let distinct: HashSet<&ChildId> = child_ids.iter().collect();
        if distinct.len() != child_ids.len() {
            return Err(EngineError::Validation(
                "The child list contains duplicates".to_string(),
            ));
        }

        validate_sponsor_info(&info, &self.config)?;

        let ttl = ttl_hours.unwrap_or(self.config.default_reservation_ttl_hours);
        if ttl < self.config.min_reservation_ttl_hours
            || ttl > self.config.max_reservation_ttl_hours
        {
            return Err(EngineError::Validation(format!(
                "Reservation TTL must be between {} and {} hours",
                self.config.min_reservation_ttl_hours, self.config.max_reservation_ttl_hours
            )));
        }

        let token = generate_token();
        let reservation_id = ReservationId::new().into_uuid();
        let expires_at = Utc::now() + Duration::hours(ttl);
        let ids: Vec<uuid::Uuid> = child_ids.iter().map(|c| c.into_uuid()).collect();

        let mut tx = self.pool.begin().await?;

        let reservation = Reservation::create(
            &mut *tx,
            CreateReservation {
                id: reservation_id,
                token_hash: hash_token(&token),
                sponsor_name: info.name.trim().to_string(),
                sponsor_email: info.email.trim().to_string(),
                sponsor_phone: info.phone,
                children_ids: ids.clone(),
                expires_at,
                origin_ip: meta.origin_ip,
                user_agent: meta.user_agent,
            },
        )
        .await?;

        // Acquire holds in ascending id order so overlapping requests take
        // row locks in the same order and cannot deadlock each other.
        let mut hold_order = ids.clone();
        hold_order.sort_unstable();

        for child_id in &hold_order {
            let held = Child::try_hold(&mut *tx, *child_id, reservation_id, expires_at).await?;
            if !held {
                // Rolls back the reservation row and every hold taken so
                // far in this call.
                tx.rollback().await?;
                return Err(EngineError::Conflict(ConflictReason::ChildUnavailable(
                    *child_id,
                )));
            }
        }

        tx.commit().await?;

        info!(
            reservation_id = %reservation.id,
            children = ids.len(),
            token = %redact_token(&token),
            %expires_at,
            "Reservation created"
        );

        dispatch(
            &self.notifier,
            NotificationEvent::ReservationCreated {
                reservation_id: reservation.id,
                sponsor_email: reservation.sponsor_email.clone(),
                token: token.clone(),
                expires_at,
            },
        );

        Ok(CreatedReservation { reservation, token })
    }

    /// Look up a reservation by bearer token and hydrate its children.
    ///
    /// `is_expired` is computed against the current clock at read time,
    /// never read back from a stored flag.
    pub async fn get_reservation(&self, token: &str) -> Result<ReservationDetails> {
        let reservation = Reservation::find_by_token_hash(&self.pool, &hash_token(token))
            .await?
            .ok_or_else(|| EngineError::NotFound("reservation".to_string()))?;

        let children = self.hydrate_children(&reservation).await?;
        let is_expired = reservation.is_expired(Utc::now());

        Ok(ReservationDetails {
            reservation,
            children,
            is_expired,
        })
    }

    /// Confirm a pending reservation.
    ///
    /// Expiry is re-checked fresh inside the transaction; a lapsed hold is
    /// never confirmable even if the caller computed `is_expired = false`
    /// moments earlier.
    pub async fn confirm_reservation(&self, token: &str) -> Result<Reservation> {
        let token_hash = hash_token(token);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let reservation = Reservation::find_by_token_hash_for_update(&mut *tx, &token_hash)
            .await?
            .ok_or_else(|| EngineError::NotFound("reservation".to_string()))?;

        match reservation.status {
            ReservationStatus::Confirmed => {
                return Err(EngineError::Conflict(
                    ConflictReason::ReservationAlreadyConfirmed,
                ));
            }
            ReservationStatus::Cancelled | ReservationStatus::Expired => {
                return Err(EngineError::Conflict(ConflictReason::ReservationClosed));
            }
            ReservationStatus::Pending => {}
        }
        if reservation.expires_at <= now {
            return Err(EngineError::Conflict(ConflictReason::ReservationExpired));
        }

        let confirmed = Reservation::try_confirm(&mut *tx, reservation.id, now)
            .await?
            .ok_or(EngineError::Conflict(ConflictReason::StateChanged))?;

        for child_id in &confirmed.children_ids {
            let ok = Child::try_confirm_held(&mut *tx, *child_id, confirmed.id).await?;
            if !ok {
                warn!(
                    reservation_id = %confirmed.id,
                    child_id = %child_id,
                    "Child state does not mirror reservation"
                );
                return Err(EngineError::Conflict(ConflictReason::ChildUnavailable(
                    *child_id,
                )));
            }
        }

        tx.commit().await?;

        info!(reservation_id = %confirmed.id, "Reservation confirmed");

        dispatch(
            &self.notifier,
            NotificationEvent::ReservationConfirmed {
                reservation_id: confirmed.id,
                sponsor_email: confirmed.sponsor_email.clone(),
            },
        );

        Ok(confirmed)
    }

    /// Self-service cancellation, allowed only while the reservation is
    /// pending. Confirmed reservations are refused with `Forbidden`; only
    /// an administrator may cancel those.
    pub async fn cancel_reservation(&self, token: &str) -> Result<Reservation> {
        let token_hash = hash_token(token);

        let mut tx = self.pool.begin().await?;

        let reservation = Reservation::find_by_token_hash_for_update(&mut *tx, &token_hash)
            .await?
            .ok_or_else(|| EngineError::NotFound("reservation".to_string()))?;

        match reservation.status {
            ReservationStatus::Confirmed => {
                return Err(EngineError::Forbidden(
                    "Confirmed reservations can only be cancelled by an administrator".to_string(),
                ));
            }
            ReservationStatus::Cancelled | ReservationStatus::Expired => {
                return Err(EngineError::Conflict(ConflictReason::ReservationClosed));
            }
            ReservationStatus::Pending => {}
        }

        let cancelled = Reservation::try_cancel(&mut *tx, reservation.id)
            .await?
            .ok_or(EngineError::Conflict(ConflictReason::StateChanged))?;

        self.release_children(&mut tx, &cancelled).await?;

        tx.commit().await?;

        info!(reservation_id = %cancelled.id, "Reservation cancelled");

        dispatch(
            &self.notifier,
            NotificationEvent::ReservationCancelled {
                reservation_id: cancelled.id,
                sponsor_email: cancelled.sponsor_email.clone(),
            },
        );

        Ok(cancelled)
    }

    /// Administrative cancellation of a pending *or confirmed* reservation,
    /// force-releasing its children.
    pub async fn cancel_reservation_admin(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Reservation> {
        let id = reservation_id.into_uuid();

        let mut tx = self.pool.begin().await?;

        let reservation = Reservation::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("reservation {id}")))?;

        if reservation.status.is_terminal() {
            return Err(EngineError::Conflict(ConflictReason::ReservationClosed));
        }

        let cancelled = Reservation::try_cancel_admin(&mut *tx, id)
            .await?
            .ok_or(EngineError::Conflict(ConflictReason::StateChanged))?;

        for child_id in &cancelled.children_ids {
            let released = Child::force_release(&mut *tx, *child_id, id).await?;
            if !released {
                warn!(reservation_id = %id, child_id = %child_id, "Child not released: hold moved on");
            }
        }

        tx.commit().await?;

        info!(reservation_id = %id, "Reservation cancelled administratively");

        dispatch(
            &self.notifier,
            NotificationEvent::ReservationCancelled {
                reservation_id: id,
                sponsor_email: cancelled.sponsor_email.clone(),
            },
        );

        Ok(cancelled)
    }

    /// Release every child of `reservation` back to `available` through
    /// the guarded release. Zero-row releases are logged and skipped: the
    /// child legitimately moved on to another hold.
    async fn release_children(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        reservation: &Reservation,
    ) -> Result<u64> {
        let mut freed = 0;
        for child_id in &reservation.children_ids {
            let released = Child::try_release(&mut **tx, *child_id, reservation.id).await?;
            if released {
                freed += 1;
            } else {
                warn!(
                    reservation_id = %reservation.id,
                    child_id = %child_id,
                    "Child not released: hold moved on"
                );
            }
        }
        Ok(freed)
    }

    /// Fetch the children of a reservation in submission order.
    async fn hydrate_children(&self, reservation: &Reservation) -> Result<Vec<Child>> {
        let rows = Child::find_by_ids(&self.pool, &reservation.children_ids).await?;
        let mut by_id: HashMap<uuid::Uuid, Child> =
            rows.into_iter().map(|c| (c.id, c)).collect();

        Ok(reservation
            .children_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect())
    }

    /// Access the configuration this service was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Access the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Expire one lapsed reservation and free its children. Used by the
/// reservation sweep; one transaction per reservation.
///
/// Returns `None` if the reservation was confirmed or cancelled between
/// the sweep's read and this write, otherwise the number of children
/// freed.
pub(crate) async fn expire_reservation(
    pool: &PgPool,
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> Result<Option<u64>> {
    let mut tx = pool.begin().await?;

    let Some(expired) = Reservation::try_expire(&mut *tx, reservation.id, now).await? else {
        return Ok(None);
    };

    let mut freed = 0;
    for child_id in &expired.children_ids {
        let released = Child::try_release(&mut *tx, *child_id, expired.id).await?;
        if released {
            freed += 1;
        } else {
            warn!(
                reservation_id = %expired.id,
                child_id = %child_id,
                "Child not released during expiry: hold moved on"
            );
        }
    }

    tx.commit().await?;

    info!(reservation_id = %expired.id, freed, "Reservation expired");
    Ok(Some(freed))
}
