//! Parallel fan-out of work units with a bounded number of in-flight days.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::errors::{
    EmptyWorkloadSnafu, IncompleteBatchSnafu, PoolClosedSnafu, ScheduleError, WorkerSnafu,
};
use super::single_request::{DayOutcome, StopReason, paginate_day};
use crate::models::{page::PageLimit, record::TickRecord, work_unit::WorkUnit};
use crate::providers::{FetchError, PageSource};

/// How many work units may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    capacity: NonZeroUsize,
}

impl WorkerPool {
    /// Execution units left to the rest of the host by default.
    pub const DEFAULT_RESERVED: usize = 2;

    /// Sizes the pool from the host's available parallelism minus `reserved`, at least one.
    pub fn from_host(reserved: usize) -> Self {
        let available = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::sized(available, reserved)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }

    fn sized(available: usize, reserved: usize) -> Self {
        let capacity = NonZeroUsize::new(available.saturating_sub(reserved))
            .unwrap_or(NonZeroUsize::MIN);
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::from_host(Self::DEFAULT_RESERVED)
    }
}

/// What a batch does when some work units fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the successful days and report the failed ones.
    #[default]
    Partial,
    /// Any failed day fails the batch.
    AllOrNothing,
}

/// The combined records of every successful work unit, in non-decreasing time order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<R> {
    records: Vec<R>,
}

impl<R: TickRecord> ResultSet<R> {
    /// Concatenates per-day records and re-sorts them by time.
    ///
    /// The sort is stable, so records sharing a time keep their per-day order.
    pub fn from_days(days: impl IntoIterator<Item = Vec<R>>) -> Self {
        let mut records: Vec<R> = days.into_iter().flatten().collect();
        records.sort_by_key(|r| r.time_ns());
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R> Default for ResultSet<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

/// Retrieval statistics for one successful work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub unit: WorkUnit,
    pub records: usize,
    pub pages: u32,
    pub stop: StopReason,
}

impl<R> From<&DayOutcome<R>> for DaySummary {
    fn from(outcome: &DayOutcome<R>) -> Self {
        Self {
            unit: outcome.unit.clone(),
            records: outcome.records.len(),
            pages: outcome.pages,
            stop: outcome.stop,
        }
    }
}

/// A work unit whose retrieval failed.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: WorkUnit,
    pub error: FetchError,
}

/// Result of running a batch of work units.
#[derive(Debug)]
pub struct BatchReport<R> {
    pub result_set: ResultSet<R>,
    /// Successful units, ordered by unit.
    pub days: Vec<DaySummary>,
    /// Failed units, ordered by unit.
    pub failures: Vec<UnitFailure>,
}

impl<R: TickRecord> BatchReport<R> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_units(&self) -> usize {
        self.days.len() + self.failures.len()
    }

    /// Units whose retrieval ended because a full page added nothing.
    pub fn convergence_anomalies(&self) -> impl Iterator<Item = &WorkUnit> {
        self.days
            .iter()
            .filter(|d| d.stop.is_convergence_anomaly())
            .map(|d| &d.unit)
    }

    /// The result set, or an error naming every failed unit.
    pub fn ensure_complete(self) -> Result<ResultSet<R>, ScheduleError> {
        let total = self.total_units();
        ensure!(
            self.failures.is_empty(),
            IncompleteBatchSnafu {
                failed: self.failures.into_iter().map(|f| f.unit).collect::<Vec<_>>(),
                total,
            }
        );
        Ok(self.result_set)
    }
}

/// Runs every unit through the pagination loop with at most `pool.capacity()` in flight.
///
/// A unit's failure is recorded and does not stop the others. The returned
/// result set is independent of completion order.
pub async fn run_batch<R, S>(
    source: Arc<S>,
    units: Vec<WorkUnit>,
    limit: PageLimit,
    pool: WorkerPool,
) -> Result<BatchReport<R>, ScheduleError>
where
    R: TickRecord,
    S: PageSource<R> + ?Sized + 'static,
{
    ensure!(!units.is_empty(), EmptyWorkloadSnafu { requested: 0usize });

    let total = units.len();
    info!(units = total, workers = pool.capacity(), kind = %R::KIND, "Starting batch");

    let permits = Arc::new(Semaphore::new(pool.capacity()));
    let mut tasks = JoinSet::new();
    for unit in units {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context(PoolClosedSnafu)?;
        let source = Arc::clone(&source);
        tasks.spawn(async move {
            let outcome = paginate_day::<R, S>(&*source, &unit, limit).await;
            drop(permit);
            (unit, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (unit, outcome) = joined.context(WorkerSnafu)?;
        match outcome {
            Ok(day) => {
                info!(
                    unit = %day.unit,
                    records = day.records.len(),
                    pages = day.pages,
                    stop = %day.stop,
                    "Day complete"
                );
                outcomes.push(day);
            }
            Err(error) => {
                error!(unit = %unit, %error, "Day failed");
                failures.push(UnitFailure { unit, error });
            }
        }
    }

    outcomes.sort_by(|a, b| a.unit.cmp(&b.unit));
    failures.sort_by(|a, b| a.unit.cmp(&b.unit));
    let days: Vec<DaySummary> = outcomes.iter().map(DaySummary::from).collect();
    let result_set = ResultSet::from_days(outcomes.into_iter().map(|d| d.records));

    let anomalies = days.iter().filter(|d| d.stop.is_convergence_anomaly()).count();
    if anomalies > 0 {
        warn!(anomalies, "Some days stopped on a full page without new records");
    }
    info!(
        records = result_set.len(),
        succeeded = days.len(),
        failed = failures.len(),
        "Batch finished"
    );

    Ok(BatchReport {
        result_set,
        days,
        failures,
    })
}

/// Applies `policy` to a finished batch.
pub(crate) fn enforce_policy<R: TickRecord>(
    report: BatchReport<R>,
    policy: FailurePolicy,
) -> Result<BatchReport<R>, ScheduleError> {
    if policy == FailurePolicy::AllOrNothing && !report.is_complete() {
        return IncompleteBatchSnafu {
            failed: report
                .failures
                .iter()
                .map(|f| f.unit.clone())
                .collect::<Vec<_>>(),
            total: report.total_units(),
        }
        .fail();
    }
    Ok(report)
}
