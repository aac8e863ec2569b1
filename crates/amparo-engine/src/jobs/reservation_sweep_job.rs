//! Reservation sweep: reclaims lapsed pending reservations.
//!
//! Every pending reservation whose expiry has passed is transitioned to
//! `expired` and its children released, one transaction per reservation.
//! The expire itself is a guarded transition re-conditioned on the expiry,
//! so a reservation confirmed between the sweep's read and its write is
//! left alone. Running the sweep twice back-to-back releases nothing the
//! second time.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use amparo_db::models::Reservation;

use crate::config::EngineConfig;
use crate::services::reservation_service::expire_reservation;

/// Default polling interval in seconds (every 15 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 900;

/// Job that reclaims lapsed pending reservations.
pub struct ReservationSweepJob {
    pool: PgPool,
    config: EngineConfig,
}

/// Statistics from one reservation sweep run.
#[derive(Debug, Clone, Default)]
pub struct ReservationSweepStats {
    /// Candidates examined.
    pub examined: usize,
    /// Reservations transitioned to `expired`.
    pub expired: usize,
    /// Children released back to `available`.
    pub children_freed: usize,
    /// Per-candidate failures; the run continued past each.
    pub errors: Vec<String>,
}

impl ReservationSweepStats {
    /// Whether any candidate failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Errors that abort a reservation sweep run outright (per-candidate
/// failures go into the stats instead).
#[derive(Debug, thiserror::Error)]
pub enum ReservationSweepJobError {
    /// The candidate query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ReservationSweepJob {
    /// Create a new reservation sweep job.
    #[must_use]
    pub fn new(pool: PgPool, config: EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Run a single sweep cycle.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<ReservationSweepStats, ReservationSweepJobError> {
        let now = Utc::now();

        let candidates =
            Reservation::find_expired_pending(&self.pool, now, self.config.sweep_batch_size)
                .await?;

        let mut stats = ReservationSweepStats {
            examined: candidates.len(),
            ..ReservationSweepStats::default()
        };

        for reservation in &candidates {
            match expire_reservation(&self.pool, reservation, now).await {
                Ok(Some(freed)) => {
                    stats.expired += 1;
                    stats.children_freed += usize::try_from(freed).unwrap_or(usize::MAX);
                }
                Ok(None) => {
                    // Confirmed or cancelled between our read and the
                    // guarded expire; nothing to reclaim.
                    debug!(reservation_id = %reservation.id, "Lapsed candidate moved on; skipped");
                }
                Err(e) => {
                    warn!(reservation_id = %reservation.id, error = %e, "Failed to expire reservation");
                    stats
                        .errors
                        .push(format!("reservation {}: {e}", reservation.id));
                }
            }
        }

        if stats.expired > 0 || stats.has_errors() {
            info!(
                examined = stats.examined,
                expired = stats.expired,
                children_freed = stats.children_freed,
                errors = stats.errors.len(),
                "Reservation sweep complete"
            );
        } else {
            debug!(
                examined = stats.examined,
                "Reservation sweep complete, nothing to do"
            );
        }

        Ok(stats)
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
        let stats = ReservationSweepStats::default();
        assert_eq!(stats.examined, 0);
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.children_freed, 0);
        assert!(!stats.has_errors());
    }

    #[test]
    fn test_errors_do_not_mask_progress() {
        let stats = ReservationSweepStats {
            examined: 3,
            expired: 2,
            children_freed: 4,
            errors: vec!["reservation x: timeout".to_string()],
        };
        assert!(stats.has_errors());
        assert_eq!(stats.expired, 2);
        assert_eq!(stats.children_freed, 4);
    }

    #[test]
    fn test_default_poll_interval() {
        assert_eq!(DEFAULT_POLL_INTERVAL_SECS, 900);
    }
}
