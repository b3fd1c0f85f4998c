//! End-to-end pipeline: region → listings → detail pages → prices → reports.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use cheongyak_crawler::{Crawler, DetailFetcher, HttpClient, ListingFetcher};
use cheongyak_shared::region::sub_district;
use cheongyak_shared::{
    AppConfig, AreaMode, CheongyakError, HttpConfig, ListingDetail, ListingSummary, Result,
};
use cheongyak_trades::TradeClient;

use crate::assembler::{Comparison, SubscriptionReport, assemble};
use crate::pricing::average_price_per_pyeong;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// A listing that produced no report, and why.
#[derive(Debug)]
pub struct SkippedItem {
    /// Detail page URL of the listing.
    pub url: String,
    pub complex_name: String,
    pub error: CheongyakError,
}

/// Result of one pipeline run. Partial results always come with their skip list.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub region: String,
    pub today: NaiveDate,
    /// Reports in listing-API order.
    pub reports: Vec<SubscriptionReport>,
    pub skipped: Vec<SkippedItem>,
    /// Listing objects the API returned that could not be read.
    pub malformed_listings: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each listing is reported or skipped.
    fn listing_done(&self, complex_name: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &PipelineOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn listing_done(&self, _complex_name: &str, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &PipelineOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// All upstream clients, wired from one config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    listings: ListingFetcher,
    crawler: Crawler,
    trades: TradeClient,
    area_mode: AreaMode,
}

impl Pipeline {
    /// Wire up the clients. The service key is read by the caller, never from config.
    pub fn new(config: &AppConfig, service_key: &str) -> Result<Self> {
        let http = HttpClient::new(&HttpConfig::from(config))?;
        Ok(Self {
            listings: ListingFetcher::new(http.clone(), config, service_key)?,
            crawler: Crawler::new(DetailFetcher::new(http.clone()), &config.pipeline),
            trades: TradeClient::new(http, config, service_key)?,
            area_mode: config.pricing.area_mode,
        })
    }

    pub fn listings(&self) -> &ListingFetcher {
        &self.listings
    }

    pub fn trades(&self) -> &TradeClient {
        &self.trades
    }

    /// Run the full pipeline for `region` as of `today`.
    ///
    /// 1. Fetch listings
    /// 2. Fetch + parse detail pages (bounded concurrency)
    /// 3. Aggregate listed prices
    /// 4. Look up nearby transaction prices
    /// 5. Assemble reports
    #[instrument(skip_all, fields(region = %region, today = %today))]
    pub async fn run(
        &self,
        region: &str,
        today: NaiveDate,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineOutcome> {
        let start = Instant::now();

        // --- Phase 1: Listings ---
        progress.phase("Fetching listings");
        let fetched = self.listings.fetch(region, today, cancel).await?;
        let total = fetched.listings.len();

        // --- Phase 2: Detail pages ---
        progress.phase("Fetching detail pages");
        let urls: Vec<String> = fetched
            .listings
            .iter()
            .map(|l| l.detail_url.clone())
            .collect();
        let crawl = self.crawler.fetch_all(&urls, cancel).await;

        // --- Phase 3-5: Price, compare, assemble ---
        progress.phase("Comparing transaction prices");
        let mut reports = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for (idx, (summary, (url, parsed))) in fetched
            .listings
            .into_iter()
            .zip(crawl.pages)
            .enumerate()
        {
            if cancel.is_cancelled() {
                return Err(CheongyakError::Cancelled);
            }
            let name = summary.complex_name.clone();

            match parsed {
                Ok(parsed) => {
                    let average_price = average_price_per_pyeong(&parsed.units, self.area_mode);
                    if let Err(e) = average_price.require() {
                        warn!(complex = %name, error = %e, "no complex-wide price");
                    }
                    let comparison = self.comparison_for(&summary, today, cancel).await?;
                    let detail = ListingDetail {
                        average_price,
                        units: parsed.units,
                        layout: parsed.layout,
                        summary,
                    };
                    reports.push(assemble(detail, comparison));
                }
                Err(CheongyakError::Cancelled) => return Err(CheongyakError::Cancelled),
                Err(error) => {
                    if error.is_item_scoped() {
                        warn!(complex = %name, %url, error = %error, "detail page not understood");
                    } else {
                        warn!(complex = %name, %url, error = %error, "detail page unavailable");
                    }
                    skipped.push(SkippedItem {
                        url,
                        complex_name: summary.complex_name,
                        error,
                    });
                }
            }
            progress.listing_done(&name, idx + 1, total);
        }

        let outcome = PipelineOutcome {
            region: region.to_string(),
            today,
            reports,
            skipped,
            malformed_listings: fetched.malformed,
            elapsed: start.elapsed(),
        };

        info!(
            reports = outcome.reports.len(),
            skipped = outcome.skipped.len(),
            malformed = outcome.malformed_listings,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "pipeline completed"
        );
        progress.done(&outcome);

        Ok(outcome)
    }

    /// Transaction comparison for one listing. Only cancellation is an error;
    /// lookup failures degrade to [`Comparison::Unavailable`].
    pub async fn comparison_for(
        &self,
        listing: &ListingSummary,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Comparison> {
        let Some(dong) = sub_district(&listing.address) else {
            return Ok(Comparison::unavailable("address has no sub-district"));
        };
        let Some(code) = listing.region_code.as_deref() else {
            return Ok(Comparison::unavailable(format!(
                "no legal-district code mapped for '{}'",
                listing.address
            )));
        };

        match self.trades.average_price(code, dong, today, cancel).await {
            Ok(avg) => Ok(avg.into()),
            Err(CheongyakError::Cancelled) => Err(CheongyakError::Cancelled),
            Err(e) => {
                warn!(complex = %listing.complex_name, error = %e, "transaction lookup failed");
                Ok(Comparison::unavailable(e.to_string()))
            }
        }
    }
}

/// Convenience wrapper: build a [`Pipeline`] and run it once.
pub async fn run(
    config: &AppConfig,
    service_key: &str,
    region: &str,
    today: NaiveDate,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<PipelineOutcome> {
    Pipeline::new(config, service_key)?
        .run(region, today, cancel, progress)
        .await
}
