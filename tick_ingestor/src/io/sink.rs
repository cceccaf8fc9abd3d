use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use snafu::{Backtrace, ResultExt, Snafu};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::models::record::TickRecord;
use crate::requests::historical::AlignedResultSet;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// A record could not be serialized.
    #[snafu(display("Failed to serialize record: {source}"))]
    Serialize {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// An error occurred while converting records into the destination format (e.g. converting to a DataFrame).
    #[snafu(display("Data conversion error: {message}"))]
    Conversion {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait DataSink<R: Sync> {
    /// The type of output returned after a successful write operation.
    ///
    /// A file sink might return the path and row count; a database sink
    /// might return the number of rows inserted.
    type Output;

    /// Writes a slice of records to the destination.
    async fn write(&self, data: &[R]) -> Result<Self::Output, SinkError>;
}

/// What a file sink wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes one JSON object per line to a file, replacing any existing content.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_values<I>(&self, values: I) -> Result<WriteSummary, SinkError>
    where
        I: IntoIterator<Item = Result<Vec<u8>, serde_json::Error>>,
    {
        let path = self.path.clone();
        let file = File::create(&path).await.context(IoSnafu { path: &path })?;
        let mut writer = BufWriter::new(file);
        let mut rows = 0;
        for line in values {
            let mut line = line.context(SerializeSnafu)?;
            line.push(b'\n');
            writer
                .write_all(&line)
                .await
                .context(IoSnafu { path: &path })?;
            rows += 1;
        }
        writer.flush().await.context(IoSnafu { path: &path })?;
        Ok(WriteSummary { path, rows })
    }

    /// Writes aligned rows as `{"time_ns": .., "<symbol>": <record or null>, ..}`.
    pub async fn write_aligned<R>(
        &self,
        aligned: &AlignedResultSet<R>,
    ) -> Result<WriteSummary, SinkError>
    where
        R: TickRecord + Serialize,
    {
        let symbols: Vec<&str> = aligned.symbols().collect();
        let lines = aligned.rows().iter().map(|row| {
            let mut object = Map::with_capacity(symbols.len() + 1);
            object.insert("time_ns".to_string(), Value::from(row.time_ns));
            for (symbol, cell) in symbols.iter().zip(&row.cells) {
                object.insert(symbol.to_string(), serde_json::to_value(cell)?);
            }
            serde_json::to_vec(&object)
        });
        self.write_values(lines).await
    }
}

#[async_trait]
impl<R> DataSink<R> for JsonLinesSink
where
    R: Serialize + Sync,
{
    type Output = WriteSummary;

    async fn write(&self, data: &[R]) -> Result<Self::Output, SinkError> {
        self.write_values(data.iter().map(serde_json::to_vec)).await
    }
}
