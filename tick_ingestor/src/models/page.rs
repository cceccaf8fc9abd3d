//! Request and response shapes exchanged with a [`PageSource`](crate::providers::PageSource).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::work_unit::WorkUnit;

/// The page size was zero or above what the remote source accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page limit must be between 1 and {max}, got {got}")]
pub struct InvalidPageLimit {
    pub got: u32,
    pub max: u32,
}

/// Maximum number of records requested per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageLimit(u32);

impl PageLimit {
    /// Largest page the remote source documents.
    pub const MAX: u32 = 50_000;

    pub fn new(limit: u32) -> Result<Self, InvalidPageLimit> {
        if limit == 0 || limit > Self::MAX {
            return Err(InvalidPageLimit {
                got: limit,
                max: Self::MAX,
            });
        }
        Ok(Self(limit))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<u32> for PageLimit {
    type Error = InvalidPageLimit;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageLimit> for u32 {
    fn from(limit: PageLimit) -> Self {
        limit.0
    }
}

/// Position of the next page request within a day.
///
/// The cursor is absolute: each request asks for records at or after the
/// largest time already accumulated, never for "the next N".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    StartOfDay,
    At(i64),
}

impl Cursor {
    /// The value sent on the wire; the start of day is offset zero.
    pub fn offset(self) -> i64 {
        match self {
            Cursor::StartOfDay => 0,
            Cursor::At(ns) => ns,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::StartOfDay => f.write_str("start-of-day"),
            Cursor::At(ns) => write!(f, "{ns}"),
        }
    }
}

/// Parameters of a single page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub symbol: String,
    pub day: NaiveDate,
    pub cursor: Cursor,
    pub limit: PageLimit,
}

impl PageRequest {
    pub fn first(unit: &WorkUnit, limit: PageLimit) -> Self {
        Self {
            symbol: unit.symbol().to_string(),
            day: unit.day(),
            cursor: Cursor::StartOfDay,
            limit,
        }
    }
}

/// A batch of records returned by one remote request.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_limit_bounds() {
        assert_eq!(PageLimit::default().get(), 50_000);
        assert!(PageLimit::new(1).is_ok());
        assert!(PageLimit::new(PageLimit::MAX).is_ok());
        assert_eq!(
            PageLimit::new(0).unwrap_err(),
            InvalidPageLimit { got: 0, max: 50_000 }
        );
        assert!(PageLimit::new(PageLimit::MAX + 1).is_err());
    }

    #[test]
    fn page_limit_deserializes_with_validation() {
        #[derive(Deserialize)]
        struct Wrapper {
            limit: PageLimit,
        }
        let ok: Wrapper = toml::from_str("limit = 1000").unwrap();
        assert_eq!(ok.limit.get(), 1000);
        assert!(toml::from_str::<Wrapper>("limit = 60000").is_err());
    }

    #[test]
    fn start_of_day_cursor_is_offset_zero() {
        assert_eq!(Cursor::default(), Cursor::StartOfDay);
        assert_eq!(Cursor::StartOfDay.offset(), 0);
        assert_eq!(Cursor::At(1_700_000_000_000_000_000).offset(), 1_700_000_000_000_000_000);
    }
}
