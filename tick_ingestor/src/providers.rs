//! Page source abstraction for paginated market data endpoints.
//!
//! This module defines the [`PageSource`] trait, the single seam between the
//! pagination core and whatever remote service serves the records. A source
//! maps `(symbol, day, cursor, limit)` to one [`Page`] of records, or to a
//! [`FetchError`]. Retrying, throttling and authentication are the source's
//! business; the pagination loop never retries on its own.
//!
//! The trait is async and object safe, so callers can pick a source at
//! runtime. Synchronous closures can be adapted with [`from_fn`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use tick_ingestor::models::{bar::Bar, page::{Page, PageRequest}};
//! use tick_ingestor::providers::{FetchError, PageSource};
//!
//! struct Quiet;
//!
//! #[async_trait]
//! impl PageSource<Bar> for Quiet {
//!     async fn fetch_page(&self, _request: &PageRequest) -> Result<Page<Bar>, FetchError> {
//!         Ok(Page::empty())
//!     }
//! }
//! ```

pub mod polygon_rest;

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    page::{Page, PageRequest},
    record::TickRecord,
};

/// Fetches one page of records for a symbol and day.
#[async_trait]
pub trait PageSource<R: TickRecord>: Send + Sync {
    /// Fetches the records at or after `request.cursor`, at most `request.limit` of them.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<R>, FetchError>;
}

/// Adapter turning a synchronous closure into a [`PageSource`].
pub struct FnSource<F>(F);

/// Wraps `f` so it can be handed to the pagination loop or the scheduler.
pub fn from_fn<F>(f: F) -> FnSource<F> {
    FnSource(f)
}

#[async_trait]
impl<R, F> PageSource<R> for FnSource<F>
where
    R: TickRecord,
    F: Fn(&PageRequest) -> Result<Page<R>, FetchError> + Send + Sync,
{
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<R>, FetchError> {
        (self.0)(request)
    }
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"), context(false))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// API key contains invalid characters.
    #[snafu(display("Invalid API key format: {source}"))]
    InvalidApiKey {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FetchError {
    /// The request never produced a response (network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Request {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The remote service answered with an error status or an error payload.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The response body did not match the expected shape.
    #[snafu(display("Malformed response: {source}"))]
    Decode {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"), context(false))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            FetchError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}
