//! Claim sweep: reclaims stale pending claims.
//!
//! Every pending claim older than the configured timeout is cancelled with
//! an automatic reason and its child released back to `available`. Each
//! candidate is processed in its own transaction; a failure on one never
//! blocks the others. A second phase reclaims quick-reserve holds that
//! expired before a claim row was written.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use amparo_db::models::{Child, Claim};

use crate::config::EngineConfig;

/// Default polling interval in seconds (hourly).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3600;

/// Job that reclaims stale pending claims.
pub struct ClaimSweepJob {
    pool: PgPool,
    config: EngineConfig,
}

/// Statistics from one claim sweep run.
#[derive(Debug, Clone, Default)]
pub struct ClaimSweepStats {
    /// Candidates examined.
    pub examined: usize,
    /// Claims cancelled and their children released.
    pub released: usize,
    /// Expired quick-reserve holds freed (no claim row behind them).
    pub orphans_released: usize,
    /// Per-candidate failures; the run continued past each.
    pub errors: Vec<String>,
}

impl ClaimSweepStats {
    /// Total children returned to the pool by this run.
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released + self.orphans_released
    }

    /// Whether any candidate failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Errors that abort a claim sweep run outright (per-candidate failures go
/// into the stats instead).
#[derive(Debug, thiserror::Error)]
pub enum ClaimSweepJobError {
    /// The candidate query or orphan reclaim failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ClaimSweepJob {
    /// Create a new claim sweep job.
    #[must_use]
    pub fn new(pool: PgPool, config: EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Run a single sweep cycle.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<ClaimSweepStats, ClaimSweepJobError> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(self.config.claim_timeout_hours);

        let candidates =
            Claim::find_stale_pending(&self.pool, cutoff, self.config.sweep_batch_size).await?;

        let mut stats = ClaimSweepStats {
            examined: candidates.len(),
            ..ClaimSweepStats::default()
        };

        for claim in &candidates {
            match self.release_claim(claim.id, claim.child_id, cutoff).await {
                Ok(true) => stats.released += 1,
                Ok(false) => {
                    // Confirmed or cancelled between our read and the
                    // guarded cancel; nothing to reclaim.
                    debug!(claim_id = %claim.id, "Stale candidate moved on; skipped");
                }
                Err(e) => {
                    warn!(claim_id = %claim.id, error = %e, "Failed to release stale claim");
                    stats.errors.push(format!("claim {}: {e}", claim.id));
                }
            }
        }

        stats.orphans_released =
            usize::try_from(Child::release_expired_orphans(&self.pool, now).await?)
                .unwrap_or(usize::MAX);

        if stats.released_count() > 0 || stats.has_errors() {
            info!(
                examined = stats.examined,
                released = stats.released,
                orphans_released = stats.orphans_released,
                errors = stats.errors.len(),
                "Claim sweep complete"
            );
        } else {
            debug!(examined = stats.examined, "Claim sweep complete, nothing to do");
        }

        Ok(stats)
    }

    /// Cancel one stale claim and release its child, in one transaction.
    ///
    /// Returns `Ok(false)` if the claim was no longer a stale pending row
    /// when the guarded cancel ran.
    async fn release_claim(
        &self,
        claim_id: uuid::Uuid,
        child_id: uuid::Uuid,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let reason = format!(
            "Automatically cancelled after {} hours without confirmation",
            self.config.claim_timeout_hours
        );

        let mut tx = self.pool.begin().await?;

        let cancelled = Claim::try_expire_pending(&mut *tx, claim_id, cutoff, &reason).await?;
        if cancelled.is_none() {
            return Ok(false);
        }

        let released = Child::try_release(&mut *tx, child_id, claim_id).await?;
        if !released {
            // The child no longer carries this hold; the ledger cancel
            // still stands.
            warn!(claim_id = %claim_id, child_id = %child_id, "Child not released: hold moved on");
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Get the recommended poll interval in seconds.
    #[must_use]
    pub const fn poll_interval_secs(&self) -> u64 {
        DEFAULT_POLL_INTERVAL_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default_values() {
        let stats = ClaimSweepStats::default();
        assert_eq!(stats.examined, 0);
        assert_eq!(stats.released, 0);
        assert_eq!(stats.orphans_released, 0);
        assert!(!stats.has_errors());
        assert_eq!(stats.released_count(), 0);
    }

    #[test]
    fn test_released_count_sums_both_phases() {
        let stats = ClaimSweepStats {
            examined: 5,
            released: 3,
            orphans_released: 2,
            errors: vec![],
        };
        assert_eq!(stats.released_count(), 5);
    }

    #[test]
    fn test_errors_are_reported_not_fatal() {
        let stats = ClaimSweepStats {
            examined: 2,
            released: 1,
            orphans_released: 0,
            errors: vec!["claim x: timeout".to_string()],
        };
        assert!(stats.has_errors());
        assert_eq!(stats.released_count(), 1);
    }

    #[test]
    fn test_default_poll_interval() {
        assert_eq!(DEFAULT_POLL_INTERVAL_SECS, 3600);
    }
}
