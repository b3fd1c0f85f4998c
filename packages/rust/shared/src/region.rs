//! Address helpers: sub-district extraction and legal-district code lookup.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Placeholder used when an address is too short to name a sub-district.
pub const UNKNOWN_SUB_DISTRICT: &str = "unknown";

/// Province/city names accepted by the listing API's region filter.
pub const PROVINCES: [&str; 17] = [
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "경기", "강원", "충북",
    "충남", "전북", "전남", "경북", "경남", "제주",
];

/// Five-digit legal-district code (시군구 level).
static REGION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").expect("region code regex"));

/// Whether `name` is in the listing API's controlled vocabulary.
pub fn is_known_province(name: &str) -> bool {
    PROVINCES.contains(&name)
}

/// Whether `code` looks like a 5-digit legal-district code.
pub fn is_region_code(code: &str) -> bool {
    REGION_CODE_RE.is_match(code)
}

/// The sub-district (읍면동) named by an address: its third whitespace token.
///
/// `"서울특별시 송파구 잠실동 40"` → `"잠실동"`. Returns `None` for addresses
/// with fewer than three tokens.
pub fn sub_district(address: &str) -> Option<&str> {
    address.split_whitespace().nth(2)
}

/// Like [`sub_district`], falling back to [`UNKNOWN_SUB_DISTRICT`].
pub fn sub_district_or_unknown(address: &str) -> &str {
    sub_district(address).unwrap_or(UNKNOWN_SUB_DISTRICT)
}

/// Resolve an address to a legal-district code using `codes`, keyed by
/// administrative prefix (`"경기도 평택시"`, `"경기도 수원시 장안구"`).
///
/// The two-token prefix is tried first, then the three-token prefix.
pub fn resolve_region_code<'a>(
    address: &str,
    codes: &'a BTreeMap<String, String>,
) -> Option<&'a str> {
    let tokens: Vec<&str> = address.split_whitespace().collect();
    [2, 3]
        .into_iter()
        .filter(|n| tokens.len() >= *n)
        .find_map(|n| codes.get(&tokens[..n].join(" ")))
        .map(String::as_str)
}
