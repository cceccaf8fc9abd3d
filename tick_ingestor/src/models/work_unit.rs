use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::record::EndpointKind;

/// One independent retrieval task: a symbol, a trading day and an endpoint.
///
/// Work units are created by the scheduler when it expands a date range and
/// are consumed once by a pagination run. They never change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkUnit {
    symbol: String,
    day: NaiveDate,
    kind: EndpointKind,
}

impl WorkUnit {
    pub fn new(symbol: impl Into<String>, day: NaiveDate, kind: EndpointKind) -> Self {
        Self {
            symbol: symbol.into(),
            day,
            kind,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.day, self.kind)
    }
}
