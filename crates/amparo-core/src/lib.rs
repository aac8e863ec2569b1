//! Core types shared across the amparo sponsorship platform.
//!
//! This crate is intentionally tiny: it holds the strongly-typed
//! identifiers that every other crate passes around. Keeping them in one
//! leaf crate prevents dependency cycles between the data layer and the
//! engine.

pub mod ids;

pub use ids::{ChildId, ClaimId, FamilyId, ParseIdError, ReservationId};
