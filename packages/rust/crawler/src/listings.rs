//! Listing fetcher for the subscription announcement API (odcloud, JSON).
//!
//! Returns announcements for one province/city whose announcement date falls
//! inside the recency window, optionally dropping ones whose application
//! window has already closed.

use std::collections::BTreeMap;

use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use cheongyak_shared::region::{is_known_province, resolve_region_code};
use cheongyak_shared::{
    AppConfig, CheongyakError, DateRange, ListingConfig, ListingSummary, Result,
};

use crate::http::HttpClient;

/// Path of the announcement-detail operation under the API base URL.
const LISTING_PATH: &str = "ApplyhomeInfoDetailSvc/v1/getAPTLttotPblancDetail";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(rename = "matchCount", default)]
    match_count: u64,
}

/// One announcement as the API spells it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawListing {
    house_nm: String,
    hssply_adres: String,
    #[serde(default)]
    tot_suply_hshldco: u32,
    #[serde(default, deserialize_with = "loose_string")]
    mdhs_telno: String,
    rcrit_pblanc_de: NaiveDate,
    #[serde(default, deserialize_with = "opt_date")]
    spsply_rcept_bgnde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    spsply_rcept_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk1_crsparea_rcptde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk1_crsparea_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk1_etc_area_rcptde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk1_etc_area_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk2_crsparea_rcptde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk2_crsparea_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk2_etc_area_rcptde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    gnrl_rnk2_etc_area_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    rcept_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    przwner_presnatn_de: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    cntrct_cncls_bgnde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    cntrct_cncls_endde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "loose_string")]
    bsns_mby_nm: String,
    #[serde(default, deserialize_with = "loose_string")]
    cnstrct_entrps_nm: String,
    #[serde(default, deserialize_with = "loose_string")]
    hmpg_adres: String,
    pblanc_url: String,
}

/// Dates arrive as `YYYY-MM-DD`, `null` or `""`.
fn opt_date<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Free-text fields that are sometimes `null` and sometimes numbers.
fn loose_string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    let raw: Option<serde_json::Value> = Option::deserialize(de)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    })
}

impl RawListing {
    fn into_summary(self, region_codes: &BTreeMap<String, String>) -> ListingSummary {
        let region_code = resolve_region_code(&self.hssply_adres, region_codes).map(str::to_string);
        let homepage_url = Some(self.hmpg_adres).filter(|s| !s.is_empty());
        ListingSummary {
            complex_name: self.house_nm.trim().to_string(),
            address: self.hssply_adres.trim().to_string(),
            region_code,
            total_units: self.tot_suply_hshldco,
            contact: self.mdhs_telno,
            announced_on: self.rcrit_pblanc_de,
            special_supply: DateRange::new(self.spsply_rcept_bgnde, self.spsply_rcept_endde),
            rank1_local: DateRange::new(
                self.gnrl_rnk1_crsparea_rcptde,
                self.gnrl_rnk1_crsparea_endde,
            ),
            rank1_other: DateRange::new(
                self.gnrl_rnk1_etc_area_rcptde,
                self.gnrl_rnk1_etc_area_endde,
            ),
            rank2_local: DateRange::new(
                self.gnrl_rnk2_crsparea_rcptde,
                self.gnrl_rnk2_crsparea_endde,
            ),
            rank2_other: DateRange::new(
                self.gnrl_rnk2_etc_area_rcptde,
                self.gnrl_rnk2_etc_area_endde,
            ),
            application_end: self.rcept_endde,
            winners_announced_on: self.przwner_presnatn_de,
            contract: DateRange::new(self.cntrct_cncls_bgnde, self.cntrct_cncls_endde),
            developer: self.bsns_mby_nm,
            constructor: self.cnstrct_entrps_nm,
            homepage_url,
            detail_url: self.pblanc_url.trim().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ListingFetcher
// ---------------------------------------------------------------------------

/// Listings returned for one region, plus how many objects were unusable.
#[derive(Debug, Clone, Default)]
pub struct FetchedListings {
    pub listings: Vec<ListingSummary>,
    /// Objects dropped because they did not deserialize.
    pub malformed: usize,
}

/// Client for the announcement listing API.
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    http: HttpClient,
    endpoint: Url,
    service_key: String,
    config: ListingConfig,
    region_codes: BTreeMap<String, String>,
}

impl ListingFetcher {
    /// Build a fetcher from the app config. The service key is supplied by the caller.
    pub fn new(http: HttpClient, config: &AppConfig, service_key: impl Into<String>) -> Result<Self> {
        let base = config.api.listing_base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/{LISTING_PATH}")).map_err(|e| {
            CheongyakError::config(format!("invalid listing_base_url '{base}': {e}"))
        })?;

        Ok(Self {
            http,
            endpoint,
            service_key: service_key.into(),
            config: config.listing.clone(),
            region_codes: config.region_codes.clone(),
        })
    }

    /// Fetch announcements for `region` (e.g. `"서울"`, `"경기"`) relative to `today`.
    ///
    /// Unknown region names produce an empty result, as upstream does.
    #[instrument(skip_all, fields(region = %region, today = %today))]
    pub async fn fetch(
        &self,
        region: &str,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<FetchedListings> {
        if !is_known_province(region) {
            warn!("region is not in the listing API vocabulary; expect no results");
        }

        let cutoff = today - ChronoDuration::days(i64::from(self.config.recency_days));
        let mut out = FetchedListings::default();
        let mut page: u64 = 1;

        loop {
            let body = self
                .http
                .get_text(&self.endpoint, &self.query(region, cutoff, page), cancel)
                .await?;
            let parsed: ListingPage = serde_json::from_str(&body).map_err(|e| {
                CheongyakError::malformed(format!("listing page {page}: {e}"))
            })?;
            debug!(page, items = parsed.data.len(), match_count = parsed.match_count, "fetched listing page");

            let page_len = parsed.data.len();
            for value in parsed.data {
                match serde_json::from_value::<RawListing>(value) {
                    Ok(raw) => {
                        let summary = raw.into_summary(&self.region_codes);
                        if self.keep(&summary, cutoff, today) {
                            out.listings.push(summary);
                        }
                    }
                    Err(e) => {
                        warn!(page, error = %e, "skipping malformed listing");
                        out.malformed += 1;
                    }
                }
            }

            if !self.config.paginate
                || page_len == 0
                || page * u64::from(self.config.per_page) >= parsed.match_count
            {
                break;
            }
            page += 1;
        }

        info!(
            listings = out.listings.len(),
            malformed = out.malformed,
            "listing fetch complete"
        );
        Ok(out)
    }

    fn query(&self, region: &str, cutoff: NaiveDate, page: u64) -> Vec<(&'static str, String)> {
        vec![
            ("serviceKey", self.service_key.clone()),
            ("page", page.to_string()),
            ("perPage", self.config.per_page.to_string()),
            ("cond[RCRIT_PBLANC_DE::GTE]", cutoff.format("%Y-%m-%d").to_string()),
            ("cond[SUBSCRPT_AREA_CODE_NM::EQ]", region.to_string()),
        ]
    }

    /// Recency window is inclusive at the edge. Listings with no application
    /// end date are never treated as closed.
    fn keep(&self, listing: &ListingSummary, cutoff: NaiveDate, today: NaiveDate) -> bool {
        if listing.announced_on < cutoff {
            return false;
        }
        if self.config.exclude_closed
            && listing.application_end.is_some_and(|end| end < today)
        {
            debug!(complex = %listing.complex_name, "application window closed");
            return false;
        }
        true
    }
}
