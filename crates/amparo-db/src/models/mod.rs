//! Database entity models.
//!
//! One module per table. Each model is a `sqlx::FromRow` struct with a
//! closed status enumeration and associated async query functions.

pub mod child;
pub mod claim;
pub mod family;
pub mod reservation;

pub use child::{Child, ChildStatus};
pub use claim::{Claim, ClaimFilter, ClaimStatus, CreateClaim, GiftPreference};
pub use family::Family;
pub use reservation::{CreateReservation, Reservation, ReservationStatus};
