//! Canonical in-memory representation of a time-series bar (OHLCV).
//!
//! Minute aggregates go through the same pagination path as ticks. A day of
//! minute bars normally fits in a single page, so the loop stops after the
//! first short page.

use serde::{Deserialize, Serialize};

use crate::models::record::{EndpointKind, TickRecord};

/// A single time-series bar (OHLCV) for a given interval start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the bar interval, nanoseconds since the Unix epoch (UTC).
    pub time_ns: i64,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval.
    pub volume: f64,

    /// Trade count for the bar. Not all providers supply this.
    pub trade_count: Option<u64>,

    /// Volume-weighted average price. Not all providers supply this.
    pub vwap: Option<f64>,
}

impl TickRecord for Bar {
    type Key = i64;

    const KIND: EndpointKind = EndpointKind::MinuteBars;

    fn time_ns(&self) -> i64 {
        self.time_ns
    }

    fn identity(&self) -> Self::Key {
        self.time_ns
    }
}
