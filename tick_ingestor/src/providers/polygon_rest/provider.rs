use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shared_utils::env::get_env_var;
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::{
    config::PolygonConfig,
    models::{
        bar::Bar,
        page::{Page, PageRequest},
        quote::Quote,
        record::{EndpointKind, TickRecord},
        trade::Trade,
    },
    providers::{
        ApiSnafu, ClientBuildSnafu, DecodeSnafu, FetchError, InvalidApiKeySnafu, PageSource,
        ProviderInitError, RequestSnafu,
        polygon_rest::{
            params::{aggregate_query, endpoint_url, tick_query, validate_symbol},
            response::{PolygonAgg, PolygonEnvelope, PolygonQuote, PolygonTrade},
        },
    },
};

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    const MAX_DELAY: Duration = Duration::from_secs(60);

    /// Delay before retry number `attempt` (zero based), capped at one minute.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay
            .checked_mul(factor)
            .map_or(Self::MAX_DELAY, |d| d.min(Self::MAX_DELAY))
    }
}

/// Page source backed by the Polygon.io REST API.
///
/// The API key is handed in explicitly and baked into the client's default
/// headers; nothing is read from process-wide state after construction. One
/// provider is shared by every worker of a batch, so its rate limiter
/// throttles the batch as a whole.
pub struct PolygonProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
    retry: RetryPolicy,
    adjusted: bool,
    agg_period_minutes: NonZeroU32,
}

impl PolygonProvider {
    /// Creates a provider using `api_key` for bearer authentication.
    pub fn new(config: &PolygonConfig, api_key: SecretString) -> Result<Self, ProviderInitError> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .context(InvalidApiKeySnafu)?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            limiter: RateLimiter::direct(Quota::per_minute(config.requests_per_minute)),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.base_delay_ms),
            },
            adjusted: config.adjusted,
            agg_period_minutes: config.agg_period_minutes,
        })
    }

    /// Creates a provider reading the API key from the variable named by
    /// `config.api_key_env`.
    pub fn from_env(config: &PolygonConfig) -> Result<Self, ProviderInitError> {
        let api_key = SecretString::new(get_env_var(&config.api_key_env)?.into());
        Self::new(config, api_key)
    }

    async fn fetch_records<P, R>(&self, request: &PageRequest) -> Result<Page<R>, FetchError>
    where
        P: DeserializeOwned,
        R: TickRecord + From<P>,
    {
        validate_symbol(&request.symbol)?;

        let url = endpoint_url(&self.base_url, R::KIND, request, self.agg_period_minutes);
        let query = match R::KIND {
            EndpointKind::MinuteBars => aggregate_query(request, self.adjusted),
            EndpointKind::Trades | EndpointKind::Quotes => tick_query(request),
        };

        let rows: Vec<P> = self.get_with_retry(&url, &query).await?;
        debug!(%url, cursor = %request.cursor, rows = rows.len(), "page received");
        Ok(Page::new(rows.into_iter().map(R::from).collect()))
    }

    async fn get_with_retry<P: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Vec<P>, FetchError> {
        let mut attempt = 0;
        loop {
            self.limiter.until_ready().await;
            match self.get_once(url, query).await {
                Ok(rows) => return Ok(rows),
                Err(err) if err.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(%url, attempt = attempt + 1, ?delay, error = %err, "transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once<P: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Vec<P>, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context(RequestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(RequestSnafu)?;

        if !status.is_success() {
            let message = if body.is_empty() {
                "Unknown API error".to_string()
            } else {
                body
            };
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        let envelope: PolygonEnvelope<P> = serde_json::from_str(&body).context(DecodeSnafu)?;
        if let Some(message) = envelope.error_message() {
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }
        Ok(envelope.into_results())
    }
}

#[async_trait]
impl PageSource<Trade> for PolygonProvider {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Trade>, FetchError> {
        self.fetch_records::<PolygonTrade, Trade>(request).await
    }
}

#[async_trait]
impl PageSource<Quote> for PolygonProvider {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Quote>, FetchError> {
        self.fetch_records::<PolygonQuote, Quote>(request).await
    }
}

#[async_trait]
impl PageSource<Bar> for PolygonProvider {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Bar>, FetchError> {
        self.fetch_records::<PolygonAgg, Bar>(request).await
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn key_with_control_characters_is_rejected() {
        let err = PolygonProvider::new(
            &PolygonConfig::default(),
            SecretString::new("bad\nkey".into()),
        )
        .err()
        .expect("newline is not a valid header value");
        assert!(matches!(err, ProviderInitError::InvalidApiKey { .. }));
    }

    #[test]
    #[serial]
    fn from_env_requires_the_configured_variable() {
        let config = PolygonConfig {
            api_key_env: "TICK_INGESTOR_TEST_MISSING_KEY".to_string(),
            ..PolygonConfig::default()
        };
        unsafe { std::env::remove_var(&config.api_key_env) };
        let err = PolygonProvider::from_env(&config).err().expect("variable is unset");
        assert!(matches!(err, ProviderInitError::MissingEnvVar { .. }));
        assert!(err.to_string().contains("TICK_INGESTOR_TEST_MISSING_KEY"));
    }

    #[test]
    #[serial]
    fn from_env_builds_with_a_key() {
        let config = PolygonConfig {
            api_key_env: "TICK_INGESTOR_TEST_KEY".to_string(),
            ..PolygonConfig::default()
        };
        unsafe { std::env::set_var(&config.api_key_env, "abc123") };
        assert!(PolygonProvider::from_env(&config).is_ok());
        unsafe { std::env::remove_var(&config.api_key_env) };
    }
}
