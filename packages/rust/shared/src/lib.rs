//! Shared types, error model, and configuration for Cheongyak.
//!
//! This crate is the foundation depended on by all other Cheongyak crates.
//! It provides:
//! - [`CheongyakError`]: the unified error type
//! - Domain types ([`ListingSummary`], [`UnitTypeRecord`], [`ListingDetail`], ...)
//! - Configuration ([`AppConfig`], [`HttpConfig`], config loading)
//! - Address helpers in [`region`]

pub mod config;
pub mod error;
pub mod region;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, AreaMode, BROWSER_USER_AGENT, HttpConfig, ListingConfig,
    PipelineConfig, PricingConfig, TradesConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, service_key,
};
pub use error::{CheongyakError, Result};
pub use types::{
    ComplexPrice, DateRange, ListingDetail, ListingSummary, PYEONG_FACTOR, RegionAveragePrice,
    SpecialCategory, SpecialSupply, UnitTypeBuilder, UnitTypeRecord, UnitTypes,
};
