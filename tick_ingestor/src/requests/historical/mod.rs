mod accumulator;
pub use accumulator::{Accumulator, MergeOutcome};

mod aligned;
pub use aligned::{AlignedResultSet, AlignedRow, FillPolicy, MultiReport};

mod batch_request;
pub use batch_request::{
    BatchReport, DaySummary, FailurePolicy, ResultSet, UnitFailure, WorkerPool, run_batch,
};

mod errors;
pub use errors::ScheduleError;

mod single_request;
pub use single_request::{DayOutcome, StopReason, paginate_day};

use std::sync::Arc;

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use snafu::ensure;
use tracing::info;

use crate::calendar::{TradingCalendar, expand_dates, filter_trading_days};
use crate::config::IngestorConfig;
use crate::models::{page::PageLimit, record::TickRecord, work_unit::WorkUnit};
use crate::providers::PageSource;
use batch_request::enforce_policy;
use errors::{EmptyWorkloadSnafu, NoSymbolsSnafu};

/// Historical tick retrieval over date ranges.
///
/// Dates are filtered through the trading calendar, each remaining day is
/// paged to convergence on the worker pool, and the days are merged into one
/// time-ordered result set.
pub struct TickHistory<S: ?Sized, C> {
    source: Arc<S>,
    calendar: C,
    pool: WorkerPool,
    page_limit: PageLimit,
    failure_policy: FailurePolicy,
}

impl<S, C> TickHistory<S, C>
where
    S: ?Sized + Send + Sync + 'static,
    C: TradingCalendar,
{
    /// A history with a host-sized pool, the maximum page size and partial-success batches.
    pub fn new(source: Arc<S>, calendar: C) -> Self {
        Self {
            source,
            calendar,
            pool: WorkerPool::default(),
            page_limit: PageLimit::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn from_config(source: Arc<S>, calendar: C, config: &IngestorConfig) -> Self {
        Self::new(source, calendar)
            .with_worker_pool(config.scheduler.worker_pool())
            .with_page_limit(config.pagination.page_limit)
            .with_failure_policy(config.scheduler.failure_policy)
    }

    pub fn with_worker_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_page_limit(mut self, limit: PageLimit) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn worker_pool(&self) -> WorkerPool {
        self.pool
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// The eligible trading days among `dates`, ascending and deduplicated.
    pub fn trading_days(&self, dates: &[NaiveDate]) -> Result<Vec<NaiveDate>, ScheduleError> {
        let days = filter_trading_days(dates, &self.calendar);
        ensure!(
            !days.is_empty(),
            EmptyWorkloadSnafu {
                requested: dates.len()
            }
        );
        Ok(days)
    }

    /// One work unit per eligible trading day of `symbol`.
    pub fn work_units<R: TickRecord>(
        &self,
        symbol: &str,
        dates: &[NaiveDate],
    ) -> Result<Vec<WorkUnit>, ScheduleError> {
        Ok(self
            .trading_days(dates)?
            .into_iter()
            .map(|day| WorkUnit::new(symbol, day, R::KIND))
            .collect())
    }

    /// Fetches every eligible day of `dates` for `symbol`.
    pub async fn fetch_range<R>(
        &self,
        symbol: &str,
        dates: &[NaiveDate],
    ) -> Result<BatchReport<R>, ScheduleError>
    where
        R: TickRecord,
        S: PageSource<R>,
    {
        let units = self.work_units::<R>(symbol, dates)?;
        info!(
            symbol,
            requested = dates.len(),
            trading_days = units.len(),
            "Fetching date range"
        );
        let report = run_batch(Arc::clone(&self.source), units, self.page_limit, self.pool).await?;
        enforce_policy(report, self.failure_policy)
    }

    /// Fetches every eligible day from `start` through `end`, inclusive.
    pub async fn fetch_between<R>(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchReport<R>, ScheduleError>
    where
        R: TickRecord,
        S: PageSource<R>,
    {
        self.fetch_range(symbol, &expand_dates(start, end)).await
    }

    /// Fetches several symbols one after another and aligns them on time.
    ///
    /// Duplicate symbols are fetched once; columns keep first-seen order.
    pub async fn fetch_range_multi<R>(
        &self,
        symbols: &[impl AsRef<str>],
        dates: &[NaiveDate],
        fill: FillPolicy,
    ) -> Result<MultiReport<R>, ScheduleError>
    where
        R: TickRecord,
        S: PageSource<R>,
    {
        let symbols: IndexSet<&str> = symbols.iter().map(|s| s.as_ref()).collect();
        ensure!(!symbols.is_empty(), NoSymbolsSnafu);
        self.trading_days(dates)?;

        let mut batches = IndexMap::with_capacity(symbols.len());
        for symbol in symbols {
            let report = self.fetch_range::<R>(symbol, dates).await?;
            batches.insert(symbol.to_string(), report);
        }
        Ok(MultiReport::from_batches(batches, fill))
    }
}
