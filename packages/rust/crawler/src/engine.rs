//! Bounded, concurrent detail-page fetching.
//!
//! Each detail URL is fetched on its own task; a semaphore caps how many are
//! in flight. Results come back in input order regardless of completion order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use cheongyak_shared::{CheongyakError, PipelineConfig, Result};

use crate::detail::{DetailFetcher, ParsedDetail};

// ---------------------------------------------------------------------------
// CrawlResult
// ---------------------------------------------------------------------------

/// Per-URL outcome of a batch, in input order.
#[derive(Debug)]
pub struct CrawlResult {
    pub pages: Vec<(String, Result<ParsedDetail>)>,
    pub duration: Duration,
}

impl CrawlResult {
    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.pages.len() - self.succeeded()
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Worker pool over [`DetailFetcher`].
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: DetailFetcher,
    concurrency: usize,
    request_delay: Duration,
}

impl Crawler {
    pub fn new(fetcher: DetailFetcher, config: &PipelineConfig) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1) as usize,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Fetch and parse every URL, at most `concurrency` at a time.
    ///
    /// Item failures are returned per URL. Cancellation surfaces as
    /// [`CheongyakError::Cancelled`] on every URL not yet finished.
    #[instrument(skip_all, fields(urls = urls.len(), concurrency = self.concurrency))]
    pub async fn fetch_all(&self, urls: &[String], cancel: &CancellationToken) -> CrawlResult {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let fetcher = self.fetcher.clone();
                let sem = semaphore.clone();
                let cancel = cancel.clone();
                let delay = self.request_delay;

                tokio::spawn(async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return Err(CheongyakError::Cancelled);
                    };
                    if cancel.is_cancelled() {
                        return Err(CheongyakError::Cancelled);
                    }
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(CheongyakError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    fetcher.fetch(&url, &cancel).await
                })
            })
            .collect();

        let mut pages = Vec::with_capacity(urls.len());
        for (url, handle) in urls.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CheongyakError::UpstreamUnavailable(format!(
                    "detail task for {url} failed: {e}"
                ))),
            };
            if let Err(e) = &outcome {
                warn!(%url, error = %e, "detail page skipped");
            }
            pages.push((url.clone(), outcome));
        }

        let result = CrawlResult {
            pages,
            duration: start.elapsed(),
        };
        info!(
            succeeded = result.succeeded(),
            failed = result.failed(),
            duration_ms = result.duration.as_millis() as u64,
            "detail crawl completed"
        );
        result
    }
}
