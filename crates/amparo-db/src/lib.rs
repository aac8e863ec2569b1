//! PostgreSQL data layer for the amparo sponsorship platform.
//!
//! This crate owns the catalog (`families`, `children`) and the two claim
//! ledgers (`claims`, `reservations`). The `children.status` column is the
//! single authoritative availability flag; every mutation of it goes
//! through the guarded conditional updates on [`models::Child`], which
//! report success solely via the affected-row count. There is no
//! SELECT-then-UPDATE anywhere in this crate.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
