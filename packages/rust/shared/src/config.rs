//! Application configuration for Cheongyak.
//!
//! User config lives at `~/.cheongyak/cheongyak.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CheongyakError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cheongyak.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cheongyak";

/// Browser-like User-Agent; the announcement site rejects bare clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching cheongyak.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub trades: TradesConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Address prefix (`"경기도 평택시"`) → 5-digit legal-district code.
    #[serde(default = "default_region_codes")]
    pub region_codes: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            listing: ListingConfig::default(),
            pricing: PricingConfig::default(),
            trades: TradesConfig::default(),
            pipeline: PipelineConfig::default(),
            region_codes: default_region_codes(),
        }
    }
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Name of the env var holding the data.go.kr service key (never the key itself).
    #[serde(default = "default_service_key_env")]
    pub service_key_env: String,

    /// Base URL of the subscription listing API.
    #[serde(default = "default_listing_base_url")]
    pub listing_base_url: String,

    /// Base URL of the apartment transaction API.
    #[serde(default = "default_trade_base_url")]
    pub trade_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubles on every further attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            service_key_env: default_service_key_env(),
            listing_base_url: default_listing_base_url(),
            trade_base_url: default_trade_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_service_key_env() -> String {
    "DATA_GO_KR_SERVICE_KEY".into()
}
fn default_listing_base_url() -> String {
    "https://api.odcloud.kr/api".into()
}
fn default_trade_base_url() -> String {
    "https://apis.data.go.kr/1613000/RTMSDataSvcAptTrade".into()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

/// `[listing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Only announcements from the last N days (inclusive) are kept.
    #[serde(default = "default_recency_days")]
    pub recency_days: u32,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Follow `matchCount` across pages instead of reading only the first.
    #[serde(default = "default_true")]
    pub paginate: bool,

    /// Drop announcements whose application window has already closed.
    #[serde(default = "default_true")]
    pub exclude_closed: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            recency_days: default_recency_days(),
            per_page: default_per_page(),
            paginate: true,
            exclude_closed: true,
        }
    }
}

fn default_recency_days() -> u32 {
    30
}
fn default_per_page() -> u32 {
    100
}
fn default_true() -> bool {
    true
}

/// How supply areas enter the complex average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaMode {
    /// Integer part of each area (`79.3049` → `79`), matching published reports.
    #[default]
    Truncated,
    /// Full-precision areas.
    Exact,
}

/// `[pricing]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub area_mode: AreaMode,
}

/// `[trades]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradesConfig {
    /// Rolling window in calendar months, current month inclusive.
    #[serde(default = "default_months")]
    pub months: u32,

    #[serde(default = "default_trade_page_size")]
    pub page_size: u32,

    /// Lifetime of cached monthly responses; 0 disables the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for TradesConfig {
    fn default() -> Self {
        Self {
            months: default_months(),
            page_size: default_trade_page_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_months() -> u32 {
    3
}
fn default_trade_page_size() -> u32 {
    1000
}
fn default_cache_ttl_secs() -> u64 {
    600
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum concurrent detail-page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Delay before each detail-page request.
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_delay_ms: 0,
        }
    }
}

fn default_concurrency() -> u32 {
    4
}

fn default_region_codes() -> BTreeMap<String, String> {
    [
        ("서울특별시 종로구", "11110"),
        ("서울특별시 중구", "11140"),
        ("서울특별시 용산구", "11170"),
        ("서울특별시 성동구", "11200"),
        ("서울특별시 광진구", "11215"),
        ("서울특별시 동대문구", "11230"),
        ("서울특별시 중랑구", "11260"),
        ("서울특별시 성북구", "11290"),
        ("서울특별시 강북구", "11305"),
        ("서울특별시 도봉구", "11320"),
        ("서울특별시 노원구", "11350"),
        ("서울특별시 은평구", "11380"),
        ("서울특별시 서대문구", "11410"),
        ("서울특별시 마포구", "11440"),
        ("서울특별시 양천구", "11470"),
        ("서울특별시 강서구", "11500"),
        ("서울특별시 구로구", "11530"),
        ("서울특별시 금천구", "11545"),
        ("서울특별시 영등포구", "11560"),
        ("서울특별시 동작구", "11590"),
        ("서울특별시 관악구", "11620"),
        ("서울특별시 서초구", "11650"),
        ("서울특별시 강남구", "11680"),
        ("서울특별시 송파구", "11710"),
        ("서울특별시 강동구", "11740"),
        ("경기도 성남시 분당구", "41135"),
        ("경기도 평택시", "41220"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// HTTP behavior shared by every upstream client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub user_agent: String,
}

impl From<&AppConfig> for HttpConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.api.timeout_secs),
            max_attempts: config.api.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.api.backoff_base_ms),
            user_agent: config.api.user_agent.clone(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cheongyak/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CheongyakError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cheongyak/cheongyak.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CheongyakError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CheongyakError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CheongyakError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CheongyakError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CheongyakError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the service key from the configured env var.
pub fn service_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.api.service_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(CheongyakError::config(format!(
            "data.go.kr service key not found. Set the {var_name} environment variable.\n\
             Request a key at https://www.data.go.kr"
        ))),
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.trades.months == 0 {
        return Err(CheongyakError::config("trades.months must be at least 1"));
    }
    if config.trades.page_size == 0 || config.listing.per_page == 0 {
        return Err(CheongyakError::config("page sizes must be positive"));
    }
    if config.pipeline.concurrency == 0 {
        return Err(CheongyakError::config("pipeline.concurrency must be positive"));
    }
    if let Some((prefix, code)) = config
        .region_codes
        .iter()
        .find(|(_, code)| !crate::region::is_region_code(code))
    {
        return Err(CheongyakError::config(format!(
            "region code for '{prefix}' must be 5 digits, got '{code}'"
        )));
    }
    Ok(())
}
