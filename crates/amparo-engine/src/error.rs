//! Engine error taxonomy.
//!
//! Callers must be able to tell "someone else just took this child" apart
//! from "your input was invalid", so conflicts carry a machine-readable
//! [`ConflictReason`] rather than a bare string. Database errors are kept
//! distinct: every guarded transition is safe to re-attempt from the top,
//! so a [`EngineError::Database`] is a retriable failure where a
//! [`EngineError::Conflict`] is authoritative.

use std::fmt::{Display, Formatter};
use thiserror::Error;
use uuid::Uuid;

/// Why a guarded transition refused to apply.
///
/// The reason is keyed to the resource's *current* status, re-read after
/// the conditional update reported zero affected rows — not to whatever the
/// caller believed at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The child is already held by another in-flight claim/reservation.
    ChildAlreadyPending,
    /// The child is already sponsored (confirmed or completed).
    ChildAlreadySponsored,
    /// The child has been withdrawn from the catalog.
    ChildInactive,
    /// A child in a multi-child request could not be held.
    ChildUnavailable(Uuid),
    /// The claim is not in the state the operation requires.
    ClaimNotPending,
    /// Completion requires a confirmed claim.
    ClaimNotConfirmed,
    /// The claim is already completed or cancelled.
    ClaimClosed,
    /// The reservation was already confirmed.
    ReservationAlreadyConfirmed,
    /// The reservation was already cancelled or expired.
    ReservationClosed,
    /// The reservation's hold lapsed before the operation ran.
    ReservationExpired,
    /// The resource changed state between our update and re-read; the
    /// operation may be retried from the top.
    StateChanged,
}

impl Display for ConflictReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChildAlreadyPending => {
                write!(f, "this child already has a sponsorship request in progress")
            }
            Self::ChildAlreadySponsored => write!(f, "this child is already sponsored"),
            Self::ChildInactive => write!(f, "this child is no longer in the catalog"),
            Self::ChildUnavailable(id) => {
                write!(f, "child {id} is no longer available")
            }
            Self::ClaimNotPending => write!(f, "the claim is no longer pending"),
            Self::ClaimNotConfirmed => write!(f, "the claim has not been confirmed"),
            Self::ClaimClosed => write!(f, "the claim is already completed or cancelled"),
            Self::ReservationAlreadyConfirmed => {
                write!(f, "the reservation was already confirmed")
            }
            Self::ReservationClosed => {
                write!(f, "the reservation was already cancelled or expired")
            }
            Self::ReservationExpired => write!(f, "the reservation has expired"),
            Self::StateChanged => {
                write!(f, "the record changed concurrently; please try again")
            }
        }
    }
}

/// Errors returned by the claim and reservation services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced child, claim, or reservation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A guarded transition found the resource already in a different
    /// state. Authoritative; retrying the same operation will not help.
    #[error("conflict: {0}")]
    Conflict(ConflictReason),

    /// Malformed sponsor input. Any hold acquired in the same call has
    /// been released before this is returned.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller is not allowed to perform this operation (e.g. a
    /// self-service cancel of a confirmed reservation).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The store was unavailable or the query failed. Safe to retry the
    /// whole operation from the top: guarded transitions are idempotent to
    /// re-attempt.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    /// Whether retrying the whole operation could succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Database(_))
            || matches!(self, Self::Conflict(ConflictReason::StateChanged))
    }

    /// Whether this is a conflict (guarded transition lost a race).
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_not_retriable() {
        let err = EngineError::Conflict(ConflictReason::ChildAlreadyPending);
        assert!(err.is_conflict());
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_state_changed_is_retriable() {
        let err = EngineError::Conflict(ConflictReason::StateChanged);
        assert!(err.is_conflict());
        assert!(err.is_retriable());
    }

    #[test]
    fn test_validation_is_distinguishable_from_conflict() {
        let validation = EngineError::Validation("email is required".to_string());
        assert!(!validation.is_conflict());
        assert!(validation.to_string().contains("validation failed"));

        let conflict = EngineError::Conflict(ConflictReason::ChildAlreadySponsored);
        assert!(conflict.to_string().contains("already sponsored"));
    }

    #[test]
    fn test_reason_messages_name_the_child() {
        let id = Uuid::new_v4();
        let msg = ConflictReason::ChildUnavailable(id).to_string();
        assert!(msg.contains(&id.to_string()));
    }
}
