//! Single-child claim workflow.
//!
//! A claim is, in effect, a reservation of cart size one: the hold, the
//! ledger row, and every later transition run through the same guarded
//! child updates the multi-child pathway uses, with the claim id as the
//! child's hold back-reference.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use amparo_core::{ChildId, ClaimId};
use amparo_db::models::{Child, Claim, ClaimFilter, CreateClaim};

use crate::config::EngineConfig;
use crate::error::{ConflictReason, EngineError, Result};
use crate::notify::{dispatch, NotificationEvent, Notifier};
use crate::services::child_conflict;
use crate::validation::{validate_sponsor_info, SponsorInfo};

/// Service for single-child sponsorship claims.
pub struct ClaimService {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl ClaimService {
    /// Create a new claim service.
    #[must_use]
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        Self {
            pool,
            notifier,
            config,
        }
    }

    /// Quick-reserve: guarded `available` -> `pending` hold on one child.
    ///
    /// Returns the held child's snapshot. The hold carries an expiry stamp
    /// and is reclaimed by the claim sweep if no claim row follows it.
    ///
    /// # Errors
    ///
    /// `Conflict` keyed to the child's current status if the guarded
    /// update lost the race; `NotFound` for an unknown child.
    pub async fn reserve(&self, child_id: ChildId) -> Result<Child> {
        let id = child_id.into_uuid();
        let expires_at = Utc::now() + Duration::hours(self.config.claim_timeout_hours);

        let held = Child::try_quick_hold(&self.pool, id, expires_at).await?;
        if !held {
            let current = Child::find_by_id(&self.pool, id).await?;
            return Err(child_conflict(current.as_ref()));
        }

        let child = Child::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("child {id}")))?;

        info!(child_id = %id, %expires_at, "Child reserved");
        Ok(child)
    }

    /// Submit a sponsorship claim for one child.
    ///
    /// The guarded hold, the sponsor-input validation, and the claim
    /// insert run in one transaction: a validation failure rolls the hold
    /// back, so no hold is ever left dangling. Notification delivery is
    /// spawned after commit and never gates the claim.
    ///
    /// # Errors
    ///
    /// `Conflict` if the child is not available, `Validation` for bad
    /// sponsor input (the hold is released before this returns).
    #[instrument(skip(self, info), fields(child_id = %child_id))]
    pub async fn create_claim(&self, child_id: ChildId, info: SponsorInfo) -> Result<Claim> {
        let child_uuid = child_id.into_uuid();
        let claim_id = ClaimId::new().into_uuid();
        let expires_at = Utc::now() + Duration::hours(self.config.claim_timeout_hours);

        let mut tx = self.pool.begin().await?;

        let held = Child::try_hold(&mut *tx, child_uuid, claim_id, expires_at).await?;
        if !held {
            tx.rollback().await?;
            let current = Child::find_by_id(&self.pool, child_uuid).await?;
            return Err(child_conflict(current.as_ref()));
        }

        // Rolling back here releases the hold acquired above.
        validate_sponsor_info(&info, &self.config)?;

        let claim = Claim::create(
            &mut *tx,
            CreateClaim {
                id: claim_id,
                child_id: child_uuid,
                sponsor_name: info.name.trim().to_string(),
                sponsor_email: info.email.trim().to_string(),
                sponsor_phone: info.phone,
                sponsor_message: info.message,
                gift_preference: info.gift_preference,
            },
        )
        .await?;

        tx.commit().await?;

        info!(claim_id = %claim.id, child_id = %child_uuid, "Claim created");

        dispatch(
            &self.notifier,
            NotificationEvent::ClaimReceived {
                claim_id: claim.id,
                child_id: child_uuid,
                sponsor_email: claim.sponsor_email.clone(),
            },
        );
        dispatch(
            &self.notifier,
            NotificationEvent::AdminClaimAlert {
                claim_id: claim.id,
                child_id: child_uuid,
            },
        );

        Ok(claim)
    }

    /// Administrative confirmation: claim `pending` -> `confirmed` and the
    /// child `pending` -> `confirmed`, atomically.
    pub async fn confirm_claim(&self, claim_id: ClaimId) -> Result<Claim> {
        let id = claim_id.into_uuid();
        let mut tx = self.pool.begin().await?;

        let claim = Claim::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("claim {id}")))?;

        let confirmed = Claim::try_confirm(&mut *tx, id)
            .await?
            .ok_or(EngineError::Conflict(ConflictReason::ClaimNotPending))?;

        let child_ok = Child::try_confirm_held(&mut *tx, claim.child_id, id).await?;
        if !child_ok {
            // The child no longer mirrors this claim; refuse rather than
            // confirm a claim whose hold was lost.
            warn!(claim_id = %id, child_id = %claim.child_id, "Child state does not mirror claim");
            return Err(EngineError::Conflict(ConflictReason::StateChanged));
        }

        tx.commit().await?;

        info!(claim_id = %id, "Claim confirmed");

        dispatch(
            &self.notifier,
            NotificationEvent::ClaimConfirmed {
                claim_id: id,
                sponsor_email: confirmed.sponsor_email.clone(),
            },
        );

        Ok(confirmed)
    }

    /// Administrative completion: claim `confirmed` -> `completed`. The
    /// child stays `confirmed`; no distinct catalog state is exposed.
    pub async fn complete_claim(&self, claim_id: ClaimId) -> Result<Claim> {
        let id = claim_id.into_uuid();

        if let Some(completed) = Claim::try_complete(&self.pool, id).await? {
            info!(claim_id = %id, "Claim completed");
            return Ok(completed);
        }

        match Claim::find_by_id(&self.pool, id).await? {
            None => Err(EngineError::NotFound(format!("claim {id}"))),
            Some(_) => Err(EngineError::Conflict(ConflictReason::ClaimNotConfirmed)),
        }
    }

    /// Administrative cancellation: claim -> `cancelled` from any active
    /// state and the child force-released to `available`.
    pub async fn cancel_claim(&self, claim_id: ClaimId, reason: &str) -> Result<Claim> {
        let id = claim_id.into_uuid();
        let mut tx = self.pool.begin().await?;

        let claim = Claim::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("claim {id}")))?;

        let cancelled = Claim::try_cancel(&mut *tx, id, reason)
            .await?
            .ok_or(EngineError::Conflict(ConflictReason::ClaimClosed))?;

        let released = Child::force_release(&mut *tx, claim.child_id, id).await?;
        if !released {
            // The child already belongs to a newer hold; the ledger cancel
            // still stands.
            warn!(claim_id = %id, child_id = %claim.child_id, "Child not released: hold moved on");
        }

        tx.commit().await?;

        info!(claim_id = %id, reason, "Claim cancelled");
        Ok(cancelled)
    }

    /// Fetch a claim by ID.
    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim> {
        let id = claim_id.into_uuid();
        Claim::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("claim {id}")))
    }

    /// List claims with filtering and pagination; returns the page and the
    /// total count.
    pub async fn list_claims(
        &self,
        filter: &ClaimFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Claim>, i64)> {
        let claims = Claim::list(&self.pool, filter, limit, offset).await?;
        let total = Claim::count(&self.pool, filter).await?;
        Ok((claims, total))
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
