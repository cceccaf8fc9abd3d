use snafu::{Backtrace, Snafu};

use crate::models::work_unit::WorkUnit;

/// Errors raised while planning or running a batch of work units.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScheduleError {
    /// Calendar filtering left nothing to fetch.
    #[snafu(display("No trading days among {requested} requested dates"))]
    EmptyWorkload {
        requested: usize,
        backtrace: Backtrace,
    },

    #[snafu(display("No symbols requested"))]
    NoSymbols { backtrace: Backtrace },

    /// The concurrency limiter was closed while units were still queued.
    #[snafu(display("Worker pool closed: {source}"))]
    PoolClosed {
        source: tokio::sync::AcquireError,
        backtrace: Backtrace,
    },

    /// A worker task panicked or was cancelled.
    #[snafu(display("Worker task failed: {source}"))]
    Worker {
        source: tokio::task::JoinError,
        backtrace: Backtrace,
    },

    /// Some units failed and the batch was required to be complete.
    #[snafu(display(
        "{} of {total} work units failed{}",
        failed.len(),
        failed.first().map(|u| format!(" (first: {u})")).unwrap_or_default()
    ))]
    IncompleteBatch {
        failed: Vec<WorkUnit>,
        total: usize,
        backtrace: Backtrace,
    },
}
