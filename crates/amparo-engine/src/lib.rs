//! Claim and reservation engine for the amparo sponsorship platform.
//!
//! Guarantees that a child in the shared pool is promised to at most one
//! sponsor at a time, under concurrent stateless requests, using nothing
//! but conditional updates and transactions against PostgreSQL — no lock
//! manager, no message broker. Holds are time-boxed and self-expire
//! through the sweep jobs.
//!
//! # Pathways
//!
//! - [`services::ClaimService`] — single-child claims (quick reserve,
//!   claim submission, administrative confirm/complete/cancel).
//! - [`services::ReservationService`] — multi-child, token-addressable
//!   reservations (availability pre-check, all-or-nothing creation,
//!   bearer-token confirm/cancel).
//!
//! Both pathways mutate `children.status` exclusively through the guarded
//! transition helpers on `amparo_db::models::Child`: a conditional
//! `UPDATE` naming the expected prior state, with `rows_affected` as the
//! only success signal. Two concurrent reserves of the same child race at
//! that statement; exactly one sees one affected row, the other gets an
//! authoritative [`error::EngineError::Conflict`].
//!
//! # Sweeps
//!
//! [`jobs::ClaimSweepJob`] and [`jobs::ReservationSweepJob`] reclaim stale
//! holds. They are idempotent, process one candidate per transaction, and
//! release children only through back-reference-conditioned transitions,
//! so they can run concurrently with live claim attempts.
//!
//! # Notifications
//!
//! Transition boundaries emit [`notify::NotificationEvent`]s through the
//! [`notify::Notifier`] trait, spawned after commit — delivery can never
//! gate or roll back a claim.

pub mod config;
pub mod error;
pub mod jobs;
pub mod notify;
pub mod services;
pub mod token;
pub mod validation;

pub use config::EngineConfig;
pub use error::{ConflictReason, EngineError, Result};
pub use jobs::{
    ClaimSweepJob, ClaimSweepJobError, ClaimSweepStats, ReservationSweepJob,
    ReservationSweepJobError, ReservationSweepStats,
};
pub use notify::{LogNotifier, NotificationEvent, Notifier, NotifyError};
pub use services::{
    AvailabilityReport, ClaimService, CreatedReservation, RequestMeta, ReservationDetails,
    ReservationService, UnavailableChild,
};
pub use validation::SponsorInfo;
