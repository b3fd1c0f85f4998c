//! Core domain types for subscription announcements.

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CheongyakError;

/// Square meters per pyeong, as used by Korean price reporting.
pub const PYEONG_FACTOR: f64 = 3.3;

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// An application window. Either side may be missing upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// True when neither bound is known.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

// ---------------------------------------------------------------------------
// ListingSummary
// ---------------------------------------------------------------------------

/// One housing-announcement record as returned by the listing API.
///
/// Keyed by [`ListingSummary::detail_url`]; upstream has no explicit ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    /// Complex name (단지명).
    pub complex_name: String,
    /// Free-text supply address (공급위치).
    pub address: String,
    /// Legal-district code resolved from the address, if mapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    /// Total households supplied (공급규모).
    pub total_units: u32,
    /// Contact phone number (문의처).
    pub contact: String,
    /// Recruitment announcement date (모집공고일).
    pub announced_on: NaiveDate,
    pub special_supply: DateRange,
    pub rank1_local: DateRange,
    pub rank1_other: DateRange,
    pub rank2_local: DateRange,
    pub rank2_other: DateRange,
    /// Final day of the whole application window (청약접수종료일).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winners_announced_on: Option<NaiveDate>,
    pub contract: DateRange,
    /// Developer (시행사).
    pub developer: String,
    /// Constructor (시공사).
    pub constructor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    /// Announcement detail page.
    pub detail_url: String,
}

// ---------------------------------------------------------------------------
// Special supply
// ---------------------------------------------------------------------------

/// The nine fixed special-supply categories, in detail-table column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialCategory {
    MultiChild,
    Newlywed,
    FirstTimeBuyer,
    Youth,
    ElderlyDependent,
    Newborn,
    InstitutionalRecommendation,
    TransferredInstitution,
    Other,
}

impl SpecialCategory {
    pub const ALL: [SpecialCategory; 9] = [
        Self::MultiChild,
        Self::Newlywed,
        Self::FirstTimeBuyer,
        Self::Youth,
        Self::ElderlyDependent,
        Self::Newborn,
        Self::InstitutionalRecommendation,
        Self::TransferredInstitution,
        Self::Other,
    ];

    /// Label used by the announcement page and the output record.
    pub fn label(self) -> &'static str {
        match self {
            Self::MultiChild => "다자녀가구",
            Self::Newlywed => "신혼부부",
            Self::FirstTimeBuyer => "생애최초",
            Self::Youth => "청년",
            Self::ElderlyDependent => "노부모부양",
            Self::Newborn => "신생아(일반형)",
            Self::InstitutionalRecommendation => "기관추천",
            Self::TransferredInstitution => "이전기관",
            Self::Other => "기타",
        }
    }
}

/// Special-supply counts for one unit type.
///
/// `categories` is indexed by [`SpecialCategory::ALL`] order. When the
/// special-supply table is absent every category is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecialSupply {
    pub total: u32,
    pub categories: [u32; 9],
}

impl SpecialSupply {
    pub fn get(&self, category: SpecialCategory) -> u32 {
        let idx = SpecialCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or(0);
        self.categories[idx]
    }

    /// Sum over the nine categories.
    pub fn category_sum(&self) -> u32 {
        self.categories.iter().sum()
    }

    /// Soft invariant: categories add up to the table total.
    pub fn is_consistent(&self) -> bool {
        self.category_sum() == self.total
    }
}

impl Serialize for SpecialSupply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(10))?;
        map.serialize_entry("전체", &self.total)?;
        for (category, count) in SpecialCategory::ALL.iter().zip(self.categories) {
            map.serialize_entry(category.label(), &count)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// UnitTypeRecord
// ---------------------------------------------------------------------------

/// One row of an announcement's per-unit-type breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitTypeRecord {
    /// Unit-type label (주택형), e.g. `059.7537A`. Unique within a listing.
    #[serde(rename = "주택형")]
    pub label: String,
    /// Supply area in square meters (주택공급면적).
    #[serde(rename = "주택공급면적")]
    pub supply_area: f64,
    #[serde(rename = "전체 공급세대수")]
    pub total_supply: u32,
    #[serde(rename = "특별 공급세대수")]
    pub special: SpecialSupply,
    #[serde(rename = "일반 공급세대수")]
    pub general_supply: u32,
    /// Highest listed price in 만원 (10,000 KRW).
    #[serde(rename = "분양가(최고가 기준)", skip_serializing_if = "Option::is_none")]
    pub price_manwon: Option<u64>,
}

/// Accumulates one unit type across the supply, special and price tables.
///
/// Records only become visible through [`UnitTypes`] once fully built.
#[derive(Debug, Clone)]
pub struct UnitTypeBuilder {
    label: String,
    supply_area: f64,
    general_supply: u32,
    special_total: u32,
    total_supply: u32,
    categories: Option<[u32; 9]>,
    price_manwon: Option<u64>,
}

impl UnitTypeBuilder {
    pub fn new(
        label: impl Into<String>,
        supply_area: f64,
        general_supply: u32,
        special_total: u32,
        total_supply: u32,
    ) -> Self {
        Self {
            label: label.into(),
            supply_area,
            general_supply,
            special_total,
            total_supply,
            categories: None,
            price_manwon: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn special_categories(&mut self, categories: [u32; 9]) -> &mut Self {
        self.categories = Some(categories);
        self
    }

    pub fn price(&mut self, price_manwon: u64) -> &mut Self {
        self.price_manwon = Some(price_manwon);
        self
    }

    pub fn build(self) -> UnitTypeRecord {
        UnitTypeRecord {
            label: self.label,
            supply_area: self.supply_area,
            total_supply: self.total_supply,
            special: SpecialSupply {
                total: self.special_total,
                categories: self.categories.unwrap_or([0; 9]),
            },
            general_supply: self.general_supply,
            price_manwon: self.price_manwon,
        }
    }
}

/// Unit-type records in scrape order, looked up by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitTypes(Vec<UnitTypeRecord>);

impl UnitTypes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a completed record. A record with an existing label replaces it
    /// in place, keeping the original position.
    pub fn insert(&mut self, record: UnitTypeRecord) {
        match self.0.iter_mut().find(|r| r.label == record.label) {
            Some(slot) => *slot = record,
            None => self.0.push(record),
        }
    }

    pub fn get(&self, label: &str) -> Option<&UnitTypeRecord> {
        self.0.iter().find(|r| r.label == label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnitTypeRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<UnitTypeRecord> for UnitTypes {
    fn from_iter<I: IntoIterator<Item = UnitTypeRecord>>(iter: I) -> Self {
        let mut units = Self::new();
        for record in iter {
            units.insert(record);
        }
        units
    }
}

impl<'a> IntoIterator for &'a UnitTypes {
    type Item = &'a UnitTypeRecord;
    type IntoIter = std::slice::Iter<'a, UnitTypeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for UnitTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in &self.0 {
            map.serialize_entry(&record.label, record)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// ListingDetail
// ---------------------------------------------------------------------------

/// Complex-wide average listed price per pyeong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexPrice {
    /// Rounded price per pyeong in 만원.
    PerPyeong(u64),
    /// No usable area/price data (total area summed to zero).
    InsufficientData,
}

impl ComplexPrice {
    pub fn value(&self) -> Option<u64> {
        match self {
            Self::PerPyeong(v) => Some(*v),
            Self::InsufficientData => None,
        }
    }

    /// The price, or [`CheongyakError::InsufficientData`] when none was derived.
    pub fn require(&self) -> crate::Result<u64> {
        self.value()
            .ok_or_else(|| CheongyakError::insufficient("total supply area is zero"))
    }
}

/// A listing extended with its parsed unit types and derived price.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetail {
    pub summary: ListingSummary,
    pub units: UnitTypes,
    pub average_price: ComplexPrice,
    /// Name of the table layout that parsed the detail page.
    pub layout: &'static str,
}

// ---------------------------------------------------------------------------
// RegionAveragePrice
// ---------------------------------------------------------------------------

/// Mean recent transaction price per pyeong for one sub-district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAveragePrice {
    pub region_code: String,
    pub sub_district: String,
    /// Year-months covered, newest first (`YYYYMM`).
    pub months: Vec<String>,
    /// Number of samples that contributed to the mean.
    pub sample_count: usize,
    /// Matching records dropped because their numbers did not parse.
    pub skipped: usize,
    /// Mean price per pyeong in 만원, rounded to two decimals.
    pub average: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(label: &str) -> UnitTypeRecord {
        UnitTypeBuilder::new(label, 79.3049, 11, 6, 17).build()
    }

    #[test]
    fn insufficient_price_is_an_error() {
        assert_eq!(ComplexPrice::PerPyeong(1708).require().unwrap(), 1708);
        assert!(matches!(
            ComplexPrice::InsufficientData.require(),
            Err(CheongyakError::InsufficientData { .. })
        ));
    }

    #[test]
    fn builder_defaults_special_categories_to_zero() {
        let record = unit("059.7537A");
        assert_eq!(record.special.total, 6);
        assert_eq!(record.special.category_sum(), 0);
        assert!(record.price_manwon.is_none());
    }

    #[test]
    fn builder_applies_categories_and_price() {
        let mut builder = UnitTypeBuilder::new("059.7537A", 79.3049, 11, 6, 17);
        builder
            .special_categories([1, 3, 1, 0, 0, 0, 1, 0, 0])
            .price(40_900);
        let record = builder.build();
        assert!(record.special.is_consistent());
        assert_eq!(record.special.get(SpecialCategory::Newlywed), 3);
        assert_eq!(record.price_manwon, Some(40_900));
    }

    #[test]
    fn unit_types_keep_scrape_order() {
        let units: UnitTypes = ["084.8277A", "059.7537A", "071.7007B"]
            .into_iter()
            .map(unit)
            .collect();
        let labels: Vec<&str> = units.iter().map(|u| u.label.as_str()).collect();
        assert_eq!(labels, ["084.8277A", "059.7537A", "071.7007B"]);
        assert!(units.get("059.7537A").is_some());
        assert!(units.get("000.0000Z").is_none());
    }

    #[test]
    fn unit_types_serialize_as_ordered_map() {
        let units: UnitTypes = ["071.7007B", "059.7537A"].into_iter().map(unit).collect();
        let json = serde_json::to_string(&units).expect("serialize");
        let first = json.find("071.7007B").expect("first label");
        let second = json.find("059.7537A").expect("second label");
        assert!(first < second);
        assert!(json.contains("\"다자녀가구\":0"));
        assert!(json.contains("\"전체\":6"));
    }

    #[test]
    fn date_range_emptiness() {
        assert!(DateRange::default().is_empty());
        let d = NaiveDate::from_ymd_opt(2025, 6, 16);
        assert!(!DateRange::new(d, None).is_empty());
    }
}
