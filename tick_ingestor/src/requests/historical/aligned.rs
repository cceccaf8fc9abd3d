//! Several symbols' result sets laid onto one time axis.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::batch_request::{BatchReport, DaySummary, ResultSet, UnitFailure};
use crate::models::{record::TickRecord, work_unit::WorkUnit};

/// How empty cells of an aligned row are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Cells without a record stay empty.
    #[default]
    None,
    /// An empty cell repeats the symbol's previous value.
    Forward,
}

/// One point on the shared time axis; `cells[i]` belongs to the i-th symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow<R> {
    pub time_ns: i64,
    pub cells: Vec<Option<R>>,
}

/// Records of several symbols merged onto a single time-ordered axis.
///
/// Every record contributes exactly one row; rows sharing a time are ordered
/// by symbol column, then by the symbol's own record order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedResultSet<R> {
    symbols: IndexSet<String>,
    rows: Vec<AlignedRow<R>>,
}

impl<R: TickRecord> AlignedResultSet<R> {
    /// Aligns per-symbol result sets. Column order follows the map's order.
    pub fn align(per_symbol: IndexMap<String, ResultSet<R>>, fill: FillPolicy) -> Self {
        let width = per_symbol.len();
        let mut entries: Vec<(i64, usize, R)> = per_symbol
            .values()
            .enumerate()
            .flat_map(|(column, set)| set.iter().map(move |r| (r.time_ns(), column, r.clone())))
            .collect();
        entries.sort_by_key(|(time_ns, column, _)| (*time_ns, *column));

        let mut last: Vec<Option<R>> = vec![None; width];
        let rows = entries
            .into_iter()
            .map(|(time_ns, column, record)| {
                last[column] = Some(record.clone());
                let mut cells: Vec<Option<R>> = vec![None; width];
                cells[column] = Some(record);
                if fill == FillPolicy::Forward {
                    for (cell, previous) in cells.iter_mut().zip(&last) {
                        if cell.is_none() {
                            cell.clone_from(previous);
                        }
                    }
                }
                AlignedRow { time_ns, cells }
            })
            .collect();

        Self {
            symbols: per_symbol.into_keys().collect(),
            rows,
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    /// Column index of `symbol`.
    pub fn column(&self, symbol: &str) -> Option<usize> {
        self.symbols.get_index_of(symbol)
    }

    pub fn rows(&self) -> &[AlignedRow<R>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell of `symbol` in row `row`, if both exist and the cell is filled.
    pub fn cell(&self, row: usize, symbol: &str) -> Option<&R> {
        let column = self.column(symbol)?;
        self.rows.get(row)?.cells.get(column)?.as_ref()
    }
}

/// Result of a multi-symbol fetch.
#[derive(Debug)]
pub struct MultiReport<R> {
    pub aligned: AlignedResultSet<R>,
    pub days: Vec<DaySummary>,
    pub failures: Vec<UnitFailure>,
}

impl<R: TickRecord> MultiReport<R> {
    /// Aligns the per-symbol batch reports and pools their summaries.
    pub fn from_batches(batches: IndexMap<String, BatchReport<R>>, fill: FillPolicy) -> Self {
        let mut days = Vec::new();
        let mut failures = Vec::new();
        let mut per_symbol = IndexMap::with_capacity(batches.len());
        for (symbol, report) in batches {
            days.extend(report.days);
            failures.extend(report.failures);
            per_symbol.insert(symbol, report.result_set);
        }
        Self {
            aligned: AlignedResultSet::align(per_symbol, fill),
            days,
            failures,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn convergence_anomalies(&self) -> impl Iterator<Item = &WorkUnit> {
        self.days
            .iter()
            .filter(|d| d.stop.is_convergence_anomaly())
            .map(|d| &d.unit)
    }
}
