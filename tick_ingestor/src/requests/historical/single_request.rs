//! Cursor pagination for a single (symbol, day) work unit.

use std::fmt;

use serde::Serialize;
use snafu::ensure;
use tracing::{debug, instrument, warn};

use super::accumulator::{Accumulator, MergeOutcome};
use crate::models::{
    page::{PageLimit, PageRequest},
    record::TickRecord,
    work_unit::WorkUnit,
};
use crate::providers::{FetchError, PageSource, ValidationSnafu};

/// Why the retrieval loop for a day stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last page carried no records.
    EmptyPage,
    /// The last page carried fewer records than the limit.
    ShortPage,
    /// A full page added nothing new.
    ///
    /// The source may still hold unseen records at the cursor time, for
    /// example more same-timestamp records than fit in one page.
    NoGrowth,
}

impl StopReason {
    /// Checks the termination predicates in order; `None` means fetch another page.
    pub fn evaluate(page_len: usize, limit: PageLimit, merge: MergeOutcome) -> Option<Self> {
        if page_len == 0 {
            Some(StopReason::EmptyPage)
        } else if page_len < limit.as_usize() {
            Some(StopReason::ShortPage)
        } else if !merge.grew() {
            Some(StopReason::NoGrowth)
        } else {
            None
        }
    }

    /// Whether the day may be incomplete.
    pub fn is_convergence_anomaly(self) -> bool {
        matches!(self, StopReason::NoGrowth)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::EmptyPage => "empty page",
            StopReason::ShortPage => "short page",
            StopReason::NoGrowth => "no growth",
        };
        f.write_str(text)
    }
}

/// The records retrieved for one work unit and how retrieval ended.
#[derive(Debug, Clone)]
pub struct DayOutcome<R> {
    pub unit: WorkUnit,
    /// Deduplicated and sorted by time.
    pub records: Vec<R>,
    pub pages: u32,
    pub stop: StopReason,
}

/// Pages through one day until the source is exhausted or stops yielding new records.
///
/// Every request after the first starts at the largest time accumulated so
/// far. Because the remote boundary is inclusive, consecutive pages overlap and
/// the overlap is removed by identity. A failed page fails the whole day; no
/// partial day is returned.
#[instrument(level = "debug", skip_all, fields(unit = %unit))]
pub async fn paginate_day<R, S>(
    source: &S,
    unit: &WorkUnit,
    limit: PageLimit,
) -> Result<DayOutcome<R>, FetchError>
where
    R: TickRecord,
    S: PageSource<R> + ?Sized,
{
    ensure!(
        unit.kind() == R::KIND,
        ValidationSnafu {
            message: format!("work unit {unit} cannot yield {} records", R::KIND),
        }
    );

    let mut acc = Accumulator::<R>::new();
    let mut request = PageRequest::first(unit, limit);
    let mut pages = 0u32;

    loop {
        let page = source.fetch_page(&request).await?;
        pages += 1;
        let page_len = page.record_count();
        let merge = acc.merge(page.records);
        debug!(
            page = pages,
            cursor = %request.cursor,
            received = page_len,
            added = merge.added(),
            total = merge.after,
            "Merged page"
        );

        if let Some(stop) = StopReason::evaluate(page_len, limit, merge) {
            if stop.is_convergence_anomaly() {
                warn!(
                    pages,
                    cursor = %request.cursor,
                    total = merge.after,
                    "Full page added no new records; day may be incomplete"
                );
            }
            return Ok(DayOutcome {
                unit: unit.clone(),
                records: acc.into_records(),
                pages,
                stop,
            });
        }

        request.cursor = acc.cursor();
    }
}
