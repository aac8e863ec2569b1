//! Background sweep jobs.
//!
//! The sweeps reclaim time-boxed holds: stale pending claims and lapsed
//! pending reservations. Both are driven by an external periodic trigger
//! (cron-equivalent) calling `run_once`, process candidates one
//! transaction at a time, and never let one bad row abort the rest of the
//! run. Both are idempotent and safe to run concurrently with live claim
//! attempts because every release is a guarded transition conditioned on
//! the hold back-reference.

pub mod claim_sweep_job;
pub mod reservation_sweep_job;

pub use claim_sweep_job::{ClaimSweepJob, ClaimSweepJobError, ClaimSweepStats};
pub use reservation_sweep_job::{
    ReservationSweepJob, ReservationSweepJobError, ReservationSweepStats,
};
