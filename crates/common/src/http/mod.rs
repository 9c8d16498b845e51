//! Shared HTTP session for all upstream services
//!
//! One session is created per pipeline run and passed explicitly to every
//! client. It owns:
//! - the reqwest connection pool (with a bounded per-request timeout)
//! - a token-bucket rate limiter shared by all requests
//! - the retry policy (exponential backoff with a fixed attempt budget)

use crate::config::HttpConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Rate limiter shared by every request of a session
pub type SessionRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Retry policy for a single request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_interval: Duration::from_millis(config.initial_backoff_ms),
            max_interval: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// Explicit network context handed to every upstream client
#[derive(Clone)]
pub struct HttpSession {
    client: reqwest::Client,
    limiter: Arc<SessionRateLimiter>,
    retry: RetryPolicy,
    max_in_flight: usize,
}

impl HttpSession {
    /// Create a session from configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry: RetryPolicy::from(config),
            max_in_flight: config.max_in_flight.max(1),
        })
    }

    /// Number of requests callers may keep in flight concurrently
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// GET a JSON document, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_json_with_query(url, &[]).await
    }

    /// GET a JSON document with query parameters, retrying transient failures
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut backoff = self.retry.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.limiter.until_ready().await;

            match self.get_once(url, query).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.retry.max_interval);
                    warn!(
                        url = url,
                        attempt = attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    metrics::record_http_retry(url);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(AppError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!(url = url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| AppError::Upstream {
            url: url.to_string(),
            message: format!("unreadable response body: {}", e),
        })
    }
}
