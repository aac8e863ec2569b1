//! Notifier contract.
//!
//! The engine calls exactly one operation it does not implement:
//! [`Notifier::notify`]. Delivery is fire-and-forget: events are dispatched
//! through [`dispatch`] *after* the owning transaction commits, on a
//! spawned task, and a failing notifier is logged and ignored — it can
//! never roll back or delay a claim. Retry/backoff belongs to the
//! implementation behind the trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::token::redact_token;

/// Errors a notifier implementation may report.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The delivery channel rejected the event.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Events emitted at claim/reservation transition boundaries.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A sponsor submitted a single-child claim.
    ClaimReceived {
        /// The new claim.
        claim_id: Uuid,
        /// The claimed child.
        child_id: Uuid,
        /// Where to send the sponsor confirmation.
        sponsor_email: String,
    },
    /// Alert for administrators that a claim needs review.
    AdminClaimAlert {
        /// The claim awaiting review.
        claim_id: Uuid,
        /// The claimed child.
        child_id: Uuid,
    },
    /// An administrator confirmed a claim.
    ClaimConfirmed {
        /// The confirmed claim.
        claim_id: Uuid,
        /// The sponsor to notify.
        sponsor_email: String,
    },
    /// A multi-child reservation was created. Carries the plaintext bearer
    /// token for out-of-band delivery; implementations must not log it.
    ReservationCreated {
        /// The new reservation.
        reservation_id: Uuid,
        /// The sponsor to notify.
        sponsor_email: String,
        /// The bearer token, delivered to the sponsor only.
        token: String,
        /// When the hold lapses.
        expires_at: DateTime<Utc>,
    },
    /// The sponsor confirmed a reservation.
    ReservationConfirmed {
        /// The confirmed reservation.
        reservation_id: Uuid,
        /// The sponsor to notify.
        sponsor_email: String,
    },
    /// A reservation was cancelled.
    ReservationCancelled {
        /// The cancelled reservation.
        reservation_id: Uuid,
        /// The sponsor to notify.
        sponsor_email: String,
    },
}

impl NotificationEvent {
    /// Short name of the event for log output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClaimReceived { .. } => "claim_received",
            Self::AdminClaimAlert { .. } => "admin_claim_alert",
            Self::ClaimConfirmed { .. } => "claim_confirmed",
            Self::ReservationCreated { .. } => "reservation_created",
            Self::ReservationConfirmed { .. } => "reservation_confirmed",
            Self::ReservationCancelled { .. } => "reservation_cancelled",
        }
    }
}

/// External collaborator that delivers notifications.
///
/// Implementations own their retry/backoff policy. The engine never awaits
/// `notify` inside a transaction.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event, best effort.
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Dispatch an event on a spawned task; failures are logged and dropped.
pub fn dispatch(notifier: &Arc<dyn Notifier>, event: NotificationEvent) {
    let notifier = Arc::clone(notifier);
    let kind = event.kind();
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(event).await {
            warn!(event = kind, error = %e, "Notification delivery failed; continuing");
        }
    });
}

/// Default notifier that records events to the log stream.
///
/// Useful in development and as the fallback when no delivery channel is
/// configured. Redacts reservation tokens.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        match &event {
            NotificationEvent::ReservationCreated {
                reservation_id,
                sponsor_email,
                token,
                expires_at,
            } => {
                debug!(
                    event = event.kind(),
                    %reservation_id,
                    sponsor_email,
                    token = %redact_token(token),
                    %expires_at,
                    "Notification"
                );
            }
            _ => {
                debug!(event = event.kind(), "Notification");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Test notifier that records every event it receives.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<NotificationEvent>>,
    }

    impl RecordingNotifier {
        pub async fn events(&self) -> Vec<NotificationEvent> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    #[test]
    fn test_event_kinds() {
        let event = NotificationEvent::ClaimReceived {
            claim_id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            sponsor_email: "s@example.com".to_string(),
        };
        assert_eq!(event.kind(), "claim_received");
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = NotificationEvent::ReservationConfirmed {
            reservation_id: Uuid::new_v4(),
            sponsor_email: "s@example.com".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "reservation_confirmed");
    }

    #[tokio::test]
    async fn test_dispatch_is_fire_and_forget() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();

        dispatch(
            &notifier,
            NotificationEvent::ClaimConfirmed {
                claim_id: Uuid::new_v4(),
                sponsor_email: "s@example.com".to_string(),
            },
        );

        // Give the spawned task a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let events = recorder.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "claim_confirmed");
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_all_events() {
        let notifier = LogNotifier;
        let result = notifier
            .notify(NotificationEvent::ReservationCreated {
                reservation_id: Uuid::new_v4(),
                sponsor_email: "s@example.com".to_string(),
                token: "deadbeef".repeat(8),
                expires_at: Utc::now(),
            })
            .await;
        assert!(result.is_ok());
    }
}
