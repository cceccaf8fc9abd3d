//! Day-partitioned historical tick retrieval.
//!
//! A request for a symbol over a set of dates is split into one work unit per
//! trading day. Each day is paged to convergence with an absolute time cursor,
//! deduplicated by record identity, and the days are fetched in parallel and
//! merged into one time-ordered result set.

pub mod calendar;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod io;
pub mod models;
pub mod providers;
pub mod requests;

pub use errors::Error;
pub use requests::historical::TickHistory;
