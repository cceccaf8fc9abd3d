//! Canonical in-memory representation of an NBBO quote.

use serde::{Deserialize, Serialize};

use crate::models::record::{EndpointKind, FloatKey, TickRecord};

/// A national best bid and offer update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// SIP timestamp in nanoseconds.
    pub sip_time: i64,
    pub exchange_time: Option<i64>,
    pub trf_time: Option<i64>,
    pub sequence_number: i64,
    pub bid_price: f64,
    pub bid_size: f64,
    pub bid_exchange: Option<i32>,
    pub ask_price: f64,
    pub ask_size: f64,
    pub ask_exchange: Option<i32>,
    #[serde(default)]
    pub conditions: Vec<i32>,
    #[serde(default)]
    pub indicators: Vec<i32>,
    pub tape: Option<i32>,
}

impl TickRecord for Quote {
    type Key = (i64, i64, FloatKey, FloatKey, FloatKey, FloatKey);

    const KIND: EndpointKind = EndpointKind::Quotes;

    fn time_ns(&self) -> i64 {
        self.sip_time
    }

    fn identity(&self) -> Self::Key {
        (
            self.sip_time,
            self.sequence_number,
            FloatKey::from(self.bid_price),
            FloatKey::from(self.bid_size),
            FloatKey::from(self.ask_price),
            FloatKey::from(self.ask_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(sequence_number: i64, bid_price: f64) -> Quote {
        Quote {
            sip_time: 1_704_205_800_000_000_000,
            exchange_time: None,
            trf_time: None,
            sequence_number,
            bid_price,
            bid_size: 2.0,
            bid_exchange: Some(11),
            ask_price: 185.6,
            ask_size: 3.0,
            ask_exchange: Some(12),
            conditions: Vec::new(),
            indicators: Vec::new(),
            tape: Some(3),
        }
    }

    #[test]
    fn updates_sharing_time_and_exchanges_stay_distinct() {
        let base = quote(7, 185.5);
        assert_ne!(base.identity(), quote(7, 185.51).identity());
        assert_ne!(base.identity(), quote(8, 185.5).identity());
    }

    #[test]
    fn redelivered_update_has_the_same_identity() {
        let mut again = quote(7, 185.5);
        again.conditions = vec![1];
        assert_eq!(quote(7, 185.5).identity(), again.identity());
    }
}
