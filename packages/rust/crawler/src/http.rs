//! Shared HTTP client with bounded retry and cooperative cancellation.
//!
//! Every upstream (listing API, detail pages, transaction API) goes through
//! [`HttpClient::get_text`]. Transport errors, `429` and `5xx` responses are
//! retried with exponential backoff; any other non-success status fails fast.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use cheongyak_shared::{CheongyakError, HttpConfig, Result};

/// Outcome of a single attempt.
enum AttemptError {
    /// Worth another try (transport failure, throttling, server error).
    Retryable(CheongyakError),
    /// Retrying cannot help.
    Fatal(CheongyakError),
}

/// Cheaply cloneable HTTP client shared by all fetchers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
    backoff_base: Duration,
}

impl HttpClient {
    /// Build a client from the resolved HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                CheongyakError::UpstreamUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
        })
    }

    /// GET `url` with `query` appended, returning the body as text.
    ///
    /// Returns [`CheongyakError::Cancelled`] as soon as `cancel` fires, even
    /// mid-request or mid-backoff.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn get_text(
        &self,
        url: &Url,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut attempt = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CheongyakError::Cancelled),
                res = self.try_get(url, query) => res,
            };

            let err = match outcome {
                Ok(body) => return Ok(body),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) => e,
            };

            if attempt >= self.max_attempts {
                warn!(attempt, error = %err, "giving up after retries");
                return Err(err);
            }

            let delay = backoff_delay(self.backoff_base, attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CheongyakError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn try_get(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> std::result::Result<String, AttemptError> {
        let response = self
            .client
            .get(url.as_str())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                AttemptError::Retryable(CheongyakError::UpstreamUnavailable(format!("{url}: {e}")))
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = CheongyakError::UpstreamUnavailable(format!("{url}: HTTP {status}"));
            return Err(if is_retryable_status(status) {
                AttemptError::Retryable(err)
            } else {
                AttemptError::Fatal(err)
            });
        }

        response.text().await.map_err(|e| {
            AttemptError::Retryable(CheongyakError::UpstreamUnavailable(format!(
                "{url}: body read failed: {e}"
            )))
        })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `base * 2^(attempt - 1)`, capped to keep the shift in range.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16))
}
