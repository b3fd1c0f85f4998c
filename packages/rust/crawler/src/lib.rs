//! Upstream fetching for subscription announcements.
//!
//! This crate provides:
//! - [`http`]: Shared HTTP client with retry and cancellation
//! - [`listings`]: Listing API client ([`ListingFetcher`])
//! - [`layouts`]: Named table-layout strategies for detail pages
//! - [`detail`]: Detail page fetch + parse ([`DetailFetcher`])
//! - [`engine`]: Bounded concurrent detail crawling ([`Crawler`])

pub mod detail;
pub mod engine;
pub mod http;
pub mod layouts;
pub mod listings;

pub use detail::{DetailFetcher, ParsedDetail, parse_detail};
pub use engine::{CrawlResult, Crawler};
pub use http::HttpClient;
pub use layouts::{HeaderLayout, LayoutRegistry, PositionalLayout, TableLayout, TableSet};
pub use listings::{FetchedListings, ListingFetcher};
