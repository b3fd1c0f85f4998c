//! Recent apartment transaction prices for a sub-district.
//!
//! Pages through the public transaction API (XML) for the most recent
//! calendar months, keeps deals in the requested sub-district (읍면동) and
//! averages their price per pyeong.

mod cache;
mod parser;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use cheongyak_crawler::HttpClient;
use cheongyak_shared::region::is_region_code;
use cheongyak_shared::{AppConfig, CheongyakError, RegionAveragePrice, Result};

pub use cache::TradeCache;
pub use parser::{TradePage, TradeRecord, TransactionSample, parse_page};

/// Operation path under the transaction API base URL.
const TRADE_PATH: &str = "getRTMSDataSvcAptTrade";

// ---------------------------------------------------------------------------
// TradeAverage
// ---------------------------------------------------------------------------

/// Outcome of a transaction-price lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeAverage {
    /// At least one usable sample.
    Available(RegionAveragePrice),
    /// No deals in the sub-district for the covered months.
    NoData {
        months: Vec<String>,
        /// Matching records dropped because their numbers did not parse.
        skipped: usize,
    },
}

// ---------------------------------------------------------------------------
// TradeClient
// ---------------------------------------------------------------------------

/// Client for the apartment transaction API. Cheap to clone; clones share a cache.
#[derive(Debug, Clone)]
pub struct TradeClient {
    http: HttpClient,
    endpoint: Url,
    service_key: String,
    months: u32,
    page_size: u32,
    cache: Arc<TradeCache>,
}

impl TradeClient {
    /// Build a client from the app config. The service key is supplied by the caller.
    pub fn new(http: HttpClient, config: &AppConfig, service_key: impl Into<String>) -> Result<Self> {
        let base = config.api.trade_base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/{TRADE_PATH}")).map_err(|e| {
            CheongyakError::config(format!("invalid trade_base_url '{base}': {e}"))
        })?;

        Ok(Self {
            http,
            endpoint,
            service_key: service_key.into(),
            months: config.trades.months.max(1),
            page_size: config.trades.page_size.max(1),
            cache: Arc::new(TradeCache::new(Duration::from_secs(
                config.trades.cache_ttl_secs,
            ))),
        })
    }

    /// Mean price per pyeong of recent deals in `sub_district`.
    ///
    /// Months are fetched concurrently and merged once all complete; any
    /// month failing fails the lookup.
    #[instrument(skip_all, fields(region_code = %region_code, sub_district = %sub_district))]
    pub async fn average_price(
        &self,
        region_code: &str,
        sub_district: &str,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<TradeAverage> {
        if !is_region_code(region_code) {
            return Err(CheongyakError::NotFound(format!(
                "legal-district code '{region_code}'"
            )));
        }

        let months = recent_year_months(today, self.months);
        // Dropping the set on an early error aborts the months still in flight.
        let mut tasks = JoinSet::new();
        for (idx, year_month) in months.iter().cloned().enumerate() {
            let client = self.clone();
            let code = region_code.to_string();
            let cancel = cancel.clone();
            tasks.spawn(async move { (idx, client.fetch_month(&code, &year_month, &cancel).await) });
        }

        let mut fetched: Vec<Option<Arc<Vec<TradeRecord>>>> = vec![None; months.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = joined.map_err(|e| {
                CheongyakError::UpstreamUnavailable(format!("month task failed: {e}"))
            })?;
            fetched[idx] = Some(result?);
        }

        let mut prices = Vec::new();
        let mut skipped = 0;
        for (year_month, records) in months.iter().zip(fetched.into_iter().flatten()) {
            for record in records.iter().filter(|r| r.sub_district == sub_district) {
                match record.to_sample() {
                    Ok(sample) => prices.push(sample.price_per_pyeong),
                    Err(e) => {
                        debug!(%year_month, error = %e, "skipping transaction");
                        skipped += 1;
                    }
                }
            }
        }

        if prices.is_empty() {
            info!(skipped, "no transactions in sub-district");
            return Ok(TradeAverage::NoData { months, skipped });
        }

        let average = round2(prices.iter().sum::<f64>() / prices.len() as f64);
        info!(samples = prices.len(), skipped, average, "transaction average computed");
        Ok(TradeAverage::Available(RegionAveragePrice {
            region_code: region_code.to_string(),
            sub_district: sub_district.to_string(),
            months,
            sample_count: prices.len(),
            skipped,
            average,
        }))
    }

    /// All records for one region and `YYYYMM`, following pagination.
    #[instrument(skip_all, fields(region_code = %region_code, year_month = %year_month))]
    pub async fn fetch_month(
        &self,
        region_code: &str,
        year_month: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<TradeRecord>>> {
        if let Some(hit) = self.cache.get(region_code, year_month).await {
            debug!(records = hit.len(), "cache hit");
            return Ok(hit);
        }

        let mut records = Vec::new();
        let mut page: u64 = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(CheongyakError::Cancelled);
            }
            let query = [
                ("serviceKey", self.service_key.clone()),
                ("LAWD_CD", region_code.to_string()),
                ("DEAL_YMD", year_month.to_string()),
                ("pageNo", page.to_string()),
                ("numOfRows", self.page_size.to_string()),
            ];
            let body = self.http.get_text(&self.endpoint, &query, cancel).await?;
            let parsed = parse_page(&body)?;
            debug!(page, items = parsed.records.len(), total = parsed.total_count, "fetched trade page");

            let page_len = parsed.records.len();
            records.extend(parsed.records);
            if page_len == 0 || page * u64::from(self.page_size) >= parsed.total_count {
                break;
            }
            page += 1;
        }

        if records.is_empty() {
            warn!("no transactions reported for month");
        }
        let records = Arc::new(records);
        self.cache.insert(region_code, year_month, records.clone()).await;
        Ok(records)
    }
}

/// The `n` most recent year-months as `YYYYMM`, newest first, current month inclusive.
pub fn recent_year_months(today: NaiveDate, n: u32) -> Vec<String> {
    let mut year = today.year();
    let mut month = today.month();
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(format!("{year:04}{month:02}"));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
