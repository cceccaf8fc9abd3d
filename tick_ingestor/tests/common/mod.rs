#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tick_ingestor::models::{
    page::{Cursor, Page, PageRequest},
    trade::Trade,
};
use tick_ingestor::providers::{ApiSnafu, FetchError, PageSource};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Nanoseconds since the epoch of `day` at 09:30 UTC plus `offset` ns.
pub fn at(day: NaiveDate, offset: i64) -> i64 {
    let open = day
        .and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
        .and_utc()
        .timestamp_nanos_opt()
        .unwrap();
    open + offset
}

pub fn trade(sip_time: i64, id: &str) -> Trade {
    Trade {
        sip_time,
        exchange_time: Some(sip_time - 1_000),
        trf_time: None,
        sequence_number: 0,
        trade_id: id.to_string(),
        exchange_id: 4,
        size: 100.0,
        price: 50.25,
        conditions: vec![12],
        tape: Some(3),
    }
}

/// `count` trades on `day`, one per microsecond.
pub fn trading_day(day: NaiveDate, count: usize) -> Vec<Trade> {
    (0..count)
        .map(|i| trade(at(day, i as i64 * 1_000), &format!("{day}-{i}")))
        .collect()
}

/// An in-memory remote that serves trades the way the real endpoint does:
/// records at or after the cursor, in time order, at most `limit` of them.
#[derive(Default)]
pub struct SimulatedRemote {
    days: HashMap<(String, NaiveDate), Vec<Trade>>,
    failing: HashSet<(String, NaiveDate)>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
}

impl SimulatedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, symbol: &str, day: NaiveDate, mut trades: Vec<Trade>) -> Self {
        trades.sort_by_key(|t| t.sip_time);
        self.days.insert((symbol.to_string(), day), trades);
        self
    }

    pub fn failing_on(mut self, symbol: &str, day: NaiveDate) -> Self {
        self.failing.insert((symbol.to_string(), day));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Cursors in request order.
    pub fn cursors(&self) -> Vec<Cursor> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.cursor)
            .collect()
    }

    pub fn requested_days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<_> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.day)
            .collect();
        days.sort();
        days.dedup();
        days
    }
}

#[async_trait]
impl PageSource<Trade> for SimulatedRemote {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Trade>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = (request.symbol.clone(), request.day);
        if self.failing.contains(&key) {
            return ApiSnafu {
                status: 500u16,
                message: format!("{} {} unavailable", request.symbol, request.day),
            }
            .fail();
        }
        let offset = request.cursor.offset();
        let records = self
            .days
            .get(&key)
            .map(|trades| {
                trades
                    .iter()
                    .filter(|t| t.sip_time >= offset)
                    .take(request.limit.get() as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Page::new(records))
    }
}
