use std::fs::{self, File};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use polars::prelude::{Column, DataFrame, PolarsResult};
use polars_io::SerWriter;
use polars_io::ipc::IpcWriter;
use snafu::ResultExt;
use uuid::Uuid;

use super::sink::{ConversionSnafu, DataSink, IoSnafu, SinkError, WriteSummary};
use crate::models::{bar::Bar, quote::Quote, record::TickRecord, trade::Trade};

/// Columnar view of a slice of records.
pub trait ToDataFrame: Sized {
    fn to_dataframe(records: &[Self]) -> PolarsResult<DataFrame>;
}

fn codes(values: &[i32]) -> String {
    values
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl ToDataFrame for Trade {
    fn to_dataframe(records: &[Self]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new("sip_time".into(), records.iter().map(|t| t.sip_time).collect::<Vec<_>>()),
            Column::new(
                "exchange_time".into(),
                records.iter().map(|t| t.exchange_time).collect::<Vec<_>>(),
            ),
            Column::new("trf_time".into(), records.iter().map(|t| t.trf_time).collect::<Vec<_>>()),
            Column::new(
                "sequence_number".into(),
                records.iter().map(|t| t.sequence_number).collect::<Vec<_>>(),
            ),
            Column::new(
                "trade_id".into(),
                records.iter().map(|t| t.trade_id.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                "exchange_id".into(),
                records.iter().map(|t| t.exchange_id).collect::<Vec<_>>(),
            ),
            Column::new("size".into(), records.iter().map(|t| t.size).collect::<Vec<_>>()),
            Column::new("price".into(), records.iter().map(|t| t.price).collect::<Vec<_>>()),
            Column::new(
                "conditions".into(),
                records.iter().map(|t| codes(&t.conditions)).collect::<Vec<_>>(),
            ),
            Column::new("tape".into(), records.iter().map(|t| t.tape).collect::<Vec<_>>()),
        ])
    }
}

impl ToDataFrame for Quote {
    fn to_dataframe(records: &[Self]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new("sip_time".into(), records.iter().map(|q| q.sip_time).collect::<Vec<_>>()),
            Column::new(
                "exchange_time".into(),
                records.iter().map(|q| q.exchange_time).collect::<Vec<_>>(),
            ),
            Column::new(
                "sequence_number".into(),
                records.iter().map(|q| q.sequence_number).collect::<Vec<_>>(),
            ),
            Column::new("bid_price".into(), records.iter().map(|q| q.bid_price).collect::<Vec<_>>()),
            Column::new("bid_size".into(), records.iter().map(|q| q.bid_size).collect::<Vec<_>>()),
            Column::new(
                "bid_exchange".into(),
                records.iter().map(|q| q.bid_exchange).collect::<Vec<_>>(),
            ),
            Column::new("ask_price".into(), records.iter().map(|q| q.ask_price).collect::<Vec<_>>()),
            Column::new("ask_size".into(), records.iter().map(|q| q.ask_size).collect::<Vec<_>>()),
            Column::new(
                "ask_exchange".into(),
                records.iter().map(|q| q.ask_exchange).collect::<Vec<_>>(),
            ),
            Column::new(
                "conditions".into(),
                records.iter().map(|q| codes(&q.conditions)).collect::<Vec<_>>(),
            ),
            Column::new("tape".into(), records.iter().map(|q| q.tape).collect::<Vec<_>>()),
        ])
    }
}

impl ToDataFrame for Bar {
    fn to_dataframe(records: &[Self]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new("time_ns".into(), records.iter().map(|b| b.time_ns).collect::<Vec<_>>()),
            Column::new("open".into(), records.iter().map(|b| b.open).collect::<Vec<_>>()),
            Column::new("high".into(), records.iter().map(|b| b.high).collect::<Vec<_>>()),
            Column::new("low".into(), records.iter().map(|b| b.low).collect::<Vec<_>>()),
            Column::new("close".into(), records.iter().map(|b| b.close).collect::<Vec<_>>()),
            Column::new("volume".into(), records.iter().map(|b| b.volume).collect::<Vec<_>>()),
            Column::new(
                "trade_count".into(),
                records.iter().map(|b| b.trade_count).collect::<Vec<_>>(),
            ),
            Column::new("vwap".into(), records.iter().map(|b| b.vwap).collect::<Vec<_>>()),
        ])
    }
}

/// Writes `df` as a Feather (Arrow IPC) file under the system temp directory.
pub fn write_dataframe_to_temp(df: &mut DataFrame, stem: &str) -> Result<PathBuf, SinkError> {
    // e.g. /tmp/tick_ingestor
    let base_temp = std::env::temp_dir().join("tick_ingestor");
    fs::create_dir_all(&base_temp).context(IoSnafu { path: &base_temp })?;

    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let output_path = base_temp.join(format!("{stem}_{timestamp}_{}.feather", Uuid::new_v4()));

    let mut file = File::create(&output_path).context(IoSnafu { path: &output_path })?;
    IpcWriter::new(&mut file)
        .finish(df)
        .map_err(|e| ConversionSnafu { message: e.to_string() }.build())?;

    Ok(output_path)
}

/// Writes each batch to a fresh Feather file named after the symbol and endpoint.
#[derive(Debug, Clone)]
pub struct FeatherSink {
    symbol: String,
}

impl FeatherSink {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

#[async_trait]
impl<R> DataSink<R> for FeatherSink
where
    R: ToDataFrame + TickRecord,
{
    type Output = WriteSummary;

    async fn write(&self, data: &[R]) -> Result<Self::Output, SinkError> {
        let mut df = R::to_dataframe(data).map_err(|e| ConversionSnafu { message: e.to_string() }.build())?;
        let path = write_dataframe_to_temp(&mut df, &format!("{}_{}", self.symbol, R::KIND))?;
        Ok(WriteSummary {
            path,
            rows: df.height(),
        })
    }
}
