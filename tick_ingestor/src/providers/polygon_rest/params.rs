//! URL and query construction for the Polygon v2 endpoints.

use std::num::NonZeroU32;

use crate::calendar::market_day_bounds;
use crate::models::page::PageRequest;
use crate::models::record::EndpointKind;
use crate::providers::{FetchError, ValidationSnafu};

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Rejects symbols that would change the shape of the request path.
pub fn validate_symbol(symbol: &str) -> Result<(), FetchError> {
    if symbol.is_empty() {
        return ValidationSnafu {
            message: "symbol cannot be empty",
        }
        .fail();
    }
    if symbol
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '&'))
    {
        return ValidationSnafu {
            message: format!("symbol contains a reserved character: '{symbol}'"),
        }
        .fail();
    }
    Ok(())
}

/// Path of the endpoint serving `kind` for the request's symbol and day.
///
/// `agg_period_minutes` is the bar width and only shapes the aggregates path.
pub fn endpoint_url(
    base_url: &str,
    kind: EndpointKind,
    request: &PageRequest,
    agg_period_minutes: NonZeroU32,
) -> String {
    let base = base_url.trim_end_matches('/');
    let symbol = &request.symbol;
    match kind {
        EndpointKind::Trades => {
            format!("{base}/v2/ticks/stocks/trades/{symbol}/{}", request.day)
        }
        EndpointKind::Quotes => {
            format!("{base}/v2/ticks/stocks/nbbo/{symbol}/{}", request.day)
        }
        EndpointKind::MinuteBars => {
            let (from_ms, to_ms) = aggregate_window_ms(request);
            format!("{base}/v2/aggs/ticker/{symbol}/range/{agg_period_minutes}/minute/{from_ms}/{to_ms}")
        }
    }
}

/// Query for the tick endpoints: the cursor goes out as `timestamp`.
pub fn tick_query(request: &PageRequest) -> Vec<(&'static str, String)> {
    vec![
        ("timestamp", request.cursor.offset().to_string()),
        ("limit", request.limit.get().to_string()),
    ]
}

pub fn aggregate_query(request: &PageRequest, adjusted: bool) -> Vec<(&'static str, String)> {
    vec![
        ("adjusted", adjusted.to_string()),
        ("sort", "asc".to_string()),
        ("limit", request.limit.get().to_string()),
    ]
}

/// Millisecond window for the aggregates endpoint: from the cursor (or the
/// start of the exchange day) to the last millisecond of the exchange day.
fn aggregate_window_ms(request: &PageRequest) -> (i64, i64) {
    let (start, end) = market_day_bounds(request.day);
    let day_start_ms = start.timestamp_millis();
    let from_ms = day_start_ms.max(request.cursor.offset() / NANOS_PER_MILLI);
    (from_ms, end.timestamp_millis() - 1)
}
