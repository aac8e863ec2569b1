//! Business logic for the claim and reservation pathways.
//!
//! Both services funnel every child mutation through the guarded helpers
//! on `amparo_db::models::Child`, so neither pathway can race the other
//! unnoticed: a hold, release, or confirmation only applies if the child is
//! still in the expected state and (where a ledger row exists) still
//! back-references the same claim/reservation.

pub mod claim_service;
pub mod reservation_service;

pub use claim_service::ClaimService;
pub use reservation_service::{
    AvailabilityReport, CreatedReservation, RequestMeta, ReservationDetails, ReservationService,
    UnavailableChild,
};

use amparo_db::models::{Child, ChildStatus};

use crate::error::{ConflictReason, EngineError};

/// Map a child's *current* state to the error a failed guarded hold should
/// surface. Called after a conditional update reported zero affected rows,
/// with a fresh read of the row.
pub(crate) fn child_conflict(child: Option<&Child>) -> EngineError {
    match child {
        None => EngineError::NotFound("child not found".to_string()),
        Some(c) => match c.status {
            ChildStatus::Pending => EngineError::Conflict(ConflictReason::ChildAlreadyPending),
            ChildStatus::Confirmed | ChildStatus::Completed => {
                EngineError::Conflict(ConflictReason::ChildAlreadySponsored)
            }
            ChildStatus::Inactive => EngineError::Conflict(ConflictReason::ChildInactive),
            // The competing hold rolled back between our update and this
            // read; the caller may retry from the top.
            ChildStatus::Available => EngineError::Conflict(ConflictReason::StateChanged),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn child(status: ChildStatus) -> Child {
        Child {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            slot_letter: "A".to_string(),
            status,
            reservation_id: None,
            reservation_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_child_is_not_found() {
        assert!(matches!(child_conflict(None), EngineError::NotFound(_)));
    }

    #[test]
    fn test_pending_child_reports_already_pending() {
        let err = child_conflict(Some(&child(ChildStatus::Pending)));
        assert!(matches!(
            err,
            EngineError::Conflict(ConflictReason::ChildAlreadyPending)
        ));
    }

    #[test]
    fn test_sponsored_statuses_report_already_sponsored() {
        for status in [ChildStatus::Confirmed, ChildStatus::Completed] {
            let err = child_conflict(Some(&child(status)));
            assert!(matches!(
                err,
                EngineError::Conflict(ConflictReason::ChildAlreadySponsored)
            ));
        }
    }

    #[test]
    fn test_inactive_child_reports_inactive() {
        let err = child_conflict(Some(&child(ChildStatus::Inactive)));
        assert!(matches!(
            err,
            EngineError::Conflict(ConflictReason::ChildInactive)
        ));
    }

    #[test]
    fn test_available_child_reports_retriable_race() {
        let err = child_conflict(Some(&child(ChildStatus::Available)));
        assert!(err.is_retriable());
    }
}
