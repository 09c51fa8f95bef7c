//! HTTP client for the upstream quote provider.
//!
//! Issues `GET {url}?fsym={BASE}&tsyms={QUOTE}` and reads the quote
//! currency's entry from a flat JSON object, e.g. `{"USD": 50123.45}`.
//! Retryable failures are retried with capped exponential backoff; every
//! wait is cut short when the caller's token is cancelled.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pricecast_core::{Currency, Pair, Price};
use pricecast_telemetry::{FetchOutcome, Metrics};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{RetryConfig, UpstreamConfig};
use crate::error::{FetchError, FetchResult};
use crate::source::{BoxFuture, PriceSource};

/// Price source backed by the upstream HTTP API.
pub struct HttpPriceSource {
    client: Client,
    url: String,
    retry: RetryConfig,
}

impl HttpPriceSource {
    /// Create a new source.
    ///
    /// Fails with `InvalidConfig` when the retry policy allows zero attempts.
    pub fn new(config: &UpstreamConfig) -> FetchResult<Self> {
        if config.retry.max_attempts == 0 {
            return Err(FetchError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            retry: config.retry.clone(),
        })
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetch `pair` with retry.
    ///
    /// Returns `Exhausted` wrapping the last cause once every attempt failed,
    /// the fatal error as-is if one occurs, or `Cancelled` if `cancel` fires
    /// during a request or a wait.
    pub async fn fetch_with_retry(
        &self,
        pair: Pair,
        cancel: &CancellationToken,
    ) -> FetchResult<Price> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                result = self.fetch_once(pair) => result,
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
            };

            let err = match result {
                Ok(price) => {
                    Metrics::fetch_attempt(FetchOutcome::Success);
                    debug!(pair = %pair, price = %price, attempt = attempt + 1, "Fetched price");
                    return Ok(price);
                }
                Err(e) if !e.is_retryable() => {
                    Metrics::fetch_attempt(FetchOutcome::Fatal);
                    return Err(e);
                }
                Err(e) => e,
            };

            Metrics::fetch_attempt(FetchOutcome::Retryable);
            attempt += 1;

            if attempt >= max_attempts {
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.retry.backoff(attempt - 1);
            warn!(
                pair = %pair,
                attempt,
                max_attempts,
                delay_ms = pricecast_telemetry::millis(delay),
                error = %err,
                "Fetch failed, retrying"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
            }
        }
    }

    async fn fetch_once(&self, pair: Pair) -> FetchResult<Price> {
        let request = self
            .client
            .get(&self.url)
            .query(&[("fsym", pair.base().as_str()), ("tsyms", pair.quote().as_str())])
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let started = Instant::now();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Metrics::fetch_latency(
            &pair.to_string(),
            started.elapsed().as_secs_f64() * 1000.0,
        );

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: HashMap<String, serde_json::Value> = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        parse_price(&body, pair.quote())
    }
}

impl PriceSource for HttpPriceSource {
    fn get_price<'a>(
        &'a self,
        pair: Pair,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, FetchResult<Price>> {
        Box::pin(self.fetch_with_retry(pair, cancel))
    }
}

/// Read `currency` from a decoded response body.
///
/// Accepts JSON numbers and numeric strings. Other keys are ignored.
fn parse_price(
    body: &HashMap<String, serde_json::Value>,
    currency: Currency,
) -> FetchResult<Price> {
    let value = body
        .get(currency.as_str())
        .ok_or(FetchError::MissingCurrency(currency))?;

    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => {
            return Err(FetchError::Decode(format!(
                "{currency} price is not numeric: {other}"
            )))
        }
    };

    raw.parse::<Price>()
        .map_err(|e| FetchError::Decode(e.to_string()))
}
