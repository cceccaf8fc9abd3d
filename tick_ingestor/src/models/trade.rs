//! Canonical in-memory representation of a single trade print.

use serde::{Deserialize, Serialize};

use crate::models::record::{EndpointKind, FloatKey, TickRecord};

/// A single trade reported to the consolidated tape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// SIP timestamp in nanoseconds. Orders trades and drives the cursor.
    pub sip_time: i64,

    /// Exchange timestamp in nanoseconds, when reported.
    pub exchange_time: Option<i64>,

    /// Trade reporting facility timestamp in nanoseconds, when reported.
    pub trf_time: Option<i64>,

    /// Sequence number assigned by the feed.
    pub sequence_number: i64,

    /// Trade id, unique per exchange.
    pub trade_id: String,

    /// Exchange the trade executed on.
    pub exchange_id: i32,

    /// Number of shares.
    pub size: f64,

    /// Execution price.
    pub price: f64,

    /// Sale condition codes.
    #[serde(default)]
    pub conditions: Vec<i32>,

    /// Tape (1 = NYSE, 2 = AMEX, 3 = Nasdaq).
    pub tape: Option<i32>,
}

impl TickRecord for Trade {
    type Key = (i64, String, FloatKey, FloatKey);

    const KIND: EndpointKind = EndpointKind::Trades;

    fn time_ns(&self) -> i64 {
        self.sip_time
    }

    fn identity(&self) -> Self::Key {
        (
            self.sip_time,
            self.trade_id.clone(),
            FloatKey::from(self.size),
            FloatKey::from(self.price),
        )
    }
}
