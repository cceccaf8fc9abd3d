use thiserror::Error;

use crate::config::ConfigError;
use crate::io::sink::SinkError;
use crate::providers::{FetchError, ProviderInitError};
use crate::requests::historical::ScheduleError;

/// The unified error type for the `tick_ingestor` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The remote source could not be set up.
    #[error("Provider initialization error: {0}")]
    ProviderInit(#[from] ProviderInitError),

    /// An error from a single page fetch, outside of a batch.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A batch could not be planned or completed.
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// An error originating from a data sink (e.g., file I/O, serialization).
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// A generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
