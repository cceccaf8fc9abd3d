//! The record abstraction shared by every paginated endpoint.
//!
//! The pagination core only needs two things from a record: a nanosecond time
//! field that orders records and drives the cursor, and an identity key that
//! makes a record unique within one trading day. Everything else a record
//! carries is payload the core passes through untouched.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// The per-day endpoint a work unit pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Historic trades (tick level).
    Trades,
    /// Historic NBBO quotes (tick level).
    Quotes,
    /// Intraday minute aggregates.
    MinuteBars,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndpointKind::Trades => "trades",
            EndpointKind::Quotes => "quotes",
            EndpointKind::MinuteBars => "minute_bars",
        };
        f.write_str(name)
    }
}

/// A record that can be paginated, merged and deduplicated.
pub trait TickRecord: Clone + Send + Sync + 'static {
    /// The composite key identifying a record within one trading day.
    type Key: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;

    /// The endpoint this record type is served by.
    const KIND: EndpointKind;

    /// Time field in nanoseconds since the Unix epoch.
    fn time_ns(&self) -> i64;

    /// Identity key used for deduplication.
    fn identity(&self) -> Self::Key;
}

/// Hashable stand-in for a float that takes part in an identity key.
///
/// Two prices are the same identity component when their bit patterns match,
/// which is what a value decoded twice from the same JSON number produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatKey(u64);

impl From<f64> for FloatKey {
    fn from(value: f64) -> Self {
        // -0.0 and 0.0 are the same price.
        if value == 0.0 {
            Self(0.0f64.to_bits())
        } else {
            Self(value.to_bits())
        }
    }
}
