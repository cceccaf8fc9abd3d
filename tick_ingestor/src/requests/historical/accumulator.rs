//! Per-day record accumulation with identity deduplication.

use std::collections::HashSet;

use crate::models::{page::Cursor, record::TickRecord};

/// Record counts observed around one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub before: usize,
    pub after: usize,
}

impl MergeOutcome {
    pub fn grew(self) -> bool {
        self.after > self.before
    }

    pub fn added(self) -> usize {
        self.after.saturating_sub(self.before)
    }
}

/// The deduplicated, time-sorted records collected so far for one day.
///
/// Records are kept in non-decreasing time order after every merge, and no
/// two records share an identity key. Among records with equal time, the one
/// accepted first stays first.
#[derive(Debug, Clone)]
pub struct Accumulator<R: TickRecord> {
    records: Vec<R>,
    seen: HashSet<R::Key>,
}

impl<R: TickRecord> Default for Accumulator<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TickRecord> Accumulator<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Adds every record of `page` whose identity is not present yet.
    pub fn merge(&mut self, page: impl IntoIterator<Item = R>) -> MergeOutcome {
        let before = self.records.len();
        let mut in_order = true;
        for record in page {
            if !self.seen.insert(record.identity()) {
                continue;
            }
            if let Some(last) = self.records.last() {
                in_order &= last.time_ns() <= record.time_ns();
            }
            self.records.push(record);
        }
        if !in_order {
            self.records.sort_by_key(|r| r.time_ns());
        }
        MergeOutcome {
            before,
            after: self.records.len(),
        }
    }

    /// Largest time present, if any record was accumulated.
    pub fn max_time(&self) -> Option<i64> {
        self.records.last().map(|r| r.time_ns())
    }

    /// Where the next page should start.
    pub fn cursor(&self) -> Cursor {
        self.max_time().map_or(Cursor::StartOfDay, Cursor::At)
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

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::models::trade::Trade;

    fn trade(sip_time: i64, id: &str, price: f64) -> Trade {
        Trade {
            sip_time,
            exchange_time: None,
            trf_time: None,
            sequence_number: 0,
            trade_id: id.to_string(),
            exchange_id: 4,
            size: 100.0,
            price,
            conditions: Vec::new(),
            tape: Some(3),
        }
    }

    #[test]
    fn empty_accumulator_starts_at_start_of_day() {
        let acc = Accumulator::<Trade>::new();
        assert!(acc.is_empty());
        assert_eq!(acc.cursor(), Cursor::StartOfDay);
    }

    #[test]
    fn merge_drops_records_already_seen() {
        let mut acc = Accumulator::new();
        let first = acc.merge(vec![trade(1, "a", 10.0), trade(2, "b", 10.0)]);
        assert_eq!(first, MergeOutcome { before: 0, after: 2 });

        let second = acc.merge(vec![trade(2, "b", 10.0), trade(3, "c", 10.0)]);
        assert_eq!(second.added(), 1);
        assert_eq!(acc.cursor(), Cursor::At(3));

        let third = acc.merge(vec![trade(3, "c", 10.0)]);
        assert!(!third.grew());
    }

    #[test]
    fn same_time_different_identity_are_both_kept() {
        let mut acc = Accumulator::new();
        acc.merge(vec![trade(5, "a", 10.0), trade(5, "a", 10.5), trade(5, "b", 10.0)]);
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn out_of_order_pages_are_resorted_stably() {
        let mut acc = Accumulator::new();
        acc.merge(vec![trade(4, "x", 1.0), trade(9, "y", 1.0)]);
        acc.merge(vec![trade(4, "z", 1.0), trade(2, "w", 1.0)]);
        let ids: Vec<_> = acc.records().iter().map(|t| t.trade_id.as_str()).collect();
        assert_eq!(ids, ["w", "x", "z", "y"]);
    }

    proptest! {
        #[test]
        fn merged_records_are_sorted_and_unique(
            pages in prop::collection::vec(
                prop::collection::vec((0i64..50, 0u8..6), 0..40),
                1..6,
            )
        ) {
            let mut acc = Accumulator::new();
            for page in pages {
                let page: Vec<Trade> = page
                    .into_iter()
                    .map(|(t, id)| trade(t, &id.to_string(), 1.0))
                    .collect();
                let before = acc.len();
                let outcome = acc.merge(page.clone());
                prop_assert_eq!(outcome.before, before);
                prop_assert!(outcome.after >= outcome.before);
                prop_assert!(!acc.merge(page).grew());
            }
            let records = acc.records();
            prop_assert!(records.windows(2).all(|w| w[0].sip_time <= w[1].sip_time));
            let keys: HashSet<_> = records.iter().map(|t| t.identity()).collect();
            prop_assert_eq!(keys.len(), records.len());
            prop_assert_eq!(acc.max_time(), records.iter().map(|t| t.sip_time).max());
        }
    }
}
