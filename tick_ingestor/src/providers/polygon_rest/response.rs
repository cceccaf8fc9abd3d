use serde::Deserialize;

use crate::models::{bar::Bar, quote::Quote, trade::Trade};

/// Envelope shared by the v2 ticks and aggregates endpoints.
///
/// Successful responses carry `results` (absent when a day has no data);
/// failures carry `status = "ERROR"` and an `error` or `message` field.
#[derive(Deserialize, Debug)]
pub struct PolygonEnvelope<T> {
    pub results: Option<Vec<T>>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl<T> PolygonEnvelope<T> {
    /// The error reported inside an HTTP 200 body, if any.
    pub fn error_message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        match self.status.as_deref() {
            Some("ERROR") => Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "unspecified error".to_string()),
            ),
            _ => None,
        }
    }

    pub fn into_results(self) -> Vec<T> {
        self.results.unwrap_or_default()
    }
}

#[derive(Deserialize, Debug)]
pub struct PolygonTrade {
    #[serde(rename = "t")]
    pub sip_time: i64,
    #[serde(rename = "y")]
    pub exchange_time: Option<i64>,
    #[serde(rename = "f")]
    pub trf_time: Option<i64>,
    #[serde(rename = "q", default)]
    pub sequence_number: i64,
    #[serde(rename = "i", default)]
    pub trade_id: String,
    #[serde(rename = "x")]
    pub exchange_id: i32,
    #[serde(rename = "s")]
    pub size: f64,
    #[serde(rename = "p")]
    pub price: f64,
    #[serde(rename = "c", default)]
    pub conditions: Vec<i32>,
    #[serde(rename = "z")]
    pub tape: Option<i32>,
}

impl From<PolygonTrade> for Trade {
    fn from(pt: PolygonTrade) -> Self {
        Trade {
            sip_time: pt.sip_time,
            exchange_time: pt.exchange_time,
            trf_time: pt.trf_time,
            sequence_number: pt.sequence_number,
            trade_id: pt.trade_id,
            exchange_id: pt.exchange_id,
            size: pt.size,
            price: pt.price,
            conditions: pt.conditions,
            tape: pt.tape,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PolygonQuote {
    #[serde(rename = "t")]
    pub sip_time: i64,
    #[serde(rename = "y")]
    pub exchange_time: Option<i64>,
    #[serde(rename = "f")]
    pub trf_time: Option<i64>,
    #[serde(rename = "q", default)]
    pub sequence_number: i64,
    #[serde(rename = "p", default)]
    pub bid_price: f64,
    #[serde(rename = "s", default)]
    pub bid_size: f64,
    #[serde(rename = "x")]
    pub bid_exchange: Option<i32>,
    #[serde(rename = "P", default)]
    pub ask_price: f64,
    #[serde(rename = "S", default)]
    pub ask_size: f64,
    #[serde(rename = "X")]
    pub ask_exchange: Option<i32>,
    #[serde(rename = "c", default)]
    pub conditions: Vec<i32>,
    #[serde(rename = "i", default)]
    pub indicators: Vec<i32>,
    #[serde(rename = "z")]
    pub tape: Option<i32>,
}

impl From<PolygonQuote> for Quote {
    fn from(pq: PolygonQuote) -> Self {
        Quote {
            sip_time: pq.sip_time,
            exchange_time: pq.exchange_time,
            trf_time: pq.trf_time,
            sequence_number: pq.sequence_number,
            bid_price: pq.bid_price,
            bid_size: pq.bid_size,
            bid_exchange: pq.bid_exchange,
            ask_price: pq.ask_price,
            ask_size: pq.ask_size,
            ask_exchange: pq.ask_exchange,
            conditions: pq.conditions,
            indicators: pq.indicators,
            tape: pq.tape,
        }
    }
}

/// One aggregate bar; `t` is the bar start in milliseconds.
#[derive(Deserialize, Debug)]
pub struct PolygonAgg {
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "n")]
    pub trade_count: Option<u64>,
    #[serde(rename = "vw")]
    pub vwap: Option<f64>,
}

impl From<PolygonAgg> for Bar {
    fn from(agg: PolygonAgg) -> Self {
        Bar {
            time_ns: agg.timestamp_ms.saturating_mul(1_000_000),
            open: agg.open,
            high: agg.high,
            low: agg.low,
            close: agg.close,
            volume: agg.volume,
            trade_count: agg.trade_count,
            vwap: agg.vwap,
        }
    }
}
