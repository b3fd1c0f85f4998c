//! Report assembly: a parsed listing plus its price comparison, as a flat
//! record keyed by the Korean field names downstream tools expect.

use chrono::NaiveDate;
use serde::Serialize;

use cheongyak_shared::region::sub_district_or_unknown;
use cheongyak_shared::{CheongyakError, ListingDetail, Result, UnitTypes};
use cheongyak_trades::TradeAverage;

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Nearby transaction prices for the complex's sub-district.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Comparison {
    Available {
        /// Mean price per pyeong in 만원, two decimals.
        average: f64,
        sample_count: usize,
        /// Matching deals left out because their numbers did not parse.
        skipped: usize,
        months: Vec<String>,
    },
    /// The lookup ran and found no usable deals.
    NoData { skipped: usize },
    /// The lookup failed; the report is still produced.
    Unavailable { reason: String },
}

impl Comparison {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn average(&self) -> Option<f64> {
        match self {
            Self::Available { average, .. } => Some(*average),
            _ => None,
        }
    }
}

impl From<TradeAverage> for Comparison {
    fn from(value: TradeAverage) -> Self {
        match value {
            TradeAverage::Available(avg) => Self::Available {
                average: avg.average,
                sample_count: avg.sample_count,
                skipped: avg.skipped,
                months: avg.months,
            },
            TradeAverage::NoData { skipped, .. } => Self::NoData { skipped },
        }
    }
}

// ---------------------------------------------------------------------------
// SubscriptionReport
// ---------------------------------------------------------------------------

/// The assembled output record for one announcement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionReport {
    #[serde(rename = "단지명")]
    pub complex_name: String,
    #[serde(rename = "공급위치")]
    pub address: String,
    #[serde(rename = "법정동코드")]
    pub region_code: Option<String>,
    #[serde(rename = "공급규모")]
    pub total_units: u32,
    #[serde(rename = "문의처")]
    pub contact: String,
    #[serde(rename = "모집공고일")]
    pub announced_on: NaiveDate,
    #[serde(rename = "특별공급 청약접수시작")]
    pub special_start: Option<NaiveDate>,
    #[serde(rename = "특별공급 청약접수종료")]
    pub special_end: Option<NaiveDate>,
    #[serde(rename = "1순위 해당지역 청약접수시작")]
    pub rank1_local_start: Option<NaiveDate>,
    #[serde(rename = "1순위 해당지역 청약접수종료")]
    pub rank1_local_end: Option<NaiveDate>,
    #[serde(rename = "1순위 기타지역 청약접수시작")]
    pub rank1_other_start: Option<NaiveDate>,
    #[serde(rename = "1순위 기타지역 청약접수종료")]
    pub rank1_other_end: Option<NaiveDate>,
    #[serde(rename = "2순위 해당지역 청약접수시작")]
    pub rank2_local_start: Option<NaiveDate>,
    #[serde(rename = "2순위 해당지역 청약접수종료")]
    pub rank2_local_end: Option<NaiveDate>,
    #[serde(rename = "2순위 기타지역 청약접수시작")]
    pub rank2_other_start: Option<NaiveDate>,
    #[serde(rename = "2순위 기타지역 청약접수종료")]
    pub rank2_other_end: Option<NaiveDate>,
    #[serde(rename = "당첨자 발표일")]
    pub winners_announced_on: Option<NaiveDate>,
    #[serde(rename = "계약 시작")]
    pub contract_start: Option<NaiveDate>,
    #[serde(rename = "계약 종료")]
    pub contract_end: Option<NaiveDate>,
    #[serde(rename = "시행사")]
    pub developer: String,
    #[serde(rename = "시공사")]
    pub constructor: String,
    #[serde(rename = "아파트 홍보 URL")]
    pub homepage_url: Option<String>,
    #[serde(rename = "분양공고 URL")]
    pub detail_url: String,
    #[serde(rename = "평형별 공급대상 및 분양가")]
    pub units: UnitTypes,
    /// `None` when the listing had no usable area/price data.
    #[serde(rename = "단지 평균 평당가")]
    pub average_price: Option<u64>,
    #[serde(rename = "읍면동")]
    pub sub_district: String,
    #[serde(rename = "주변 시세 평균 평당가")]
    pub comparison: Comparison,
    #[serde(rename = "상세 테이블 레이아웃")]
    pub layout: String,
}

impl SubscriptionReport {
    /// Field name → value mapping, in declaration order.
    pub fn to_record(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(CheongyakError::malformed(format!(
                "report serialized to a non-object: {other}"
            ))),
            Err(e) => Err(CheongyakError::malformed(format!("report serialization: {e}"))),
        }
    }
}

/// Combine a parsed listing with its transaction comparison.
pub fn assemble(detail: ListingDetail, comparison: Comparison) -> SubscriptionReport {
    let ListingDetail {
        summary: s,
        units,
        average_price,
        layout,
    } = detail;
    let sub_district = sub_district_or_unknown(&s.address).to_string();

    SubscriptionReport {
        complex_name: s.complex_name,
        region_code: s.region_code,
        total_units: s.total_units,
        contact: s.contact,
        announced_on: s.announced_on,
        special_start: s.special_supply.start,
        special_end: s.special_supply.end,
        rank1_local_start: s.rank1_local.start,
        rank1_local_end: s.rank1_local.end,
        rank1_other_start: s.rank1_other.start,
        rank1_other_end: s.rank1_other.end,
        rank2_local_start: s.rank2_local.start,
        rank2_local_end: s.rank2_local.end,
        rank2_other_start: s.rank2_other.start,
        rank2_other_end: s.rank2_other.end,
        winners_announced_on: s.winners_announced_on,
        contract_start: s.contract.start,
        contract_end: s.contract.end,
        developer: s.developer,
        constructor: s.constructor,
        homepage_url: s.homepage_url,
        detail_url: s.detail_url,
        units,
        average_price: average_price.value(),
        sub_district,
        comparison,
        layout: layout.to_string(),
        address: s.address,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cheongyak_shared::{
        ComplexPrice, DateRange, ListingSummary, RegionAveragePrice, UnitTypeBuilder,
    };

    pub(crate) fn summary(address: &str) -> ListingSummary {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day);
        ListingSummary {
            complex_name: "브레인시티 수자인".into(),
            address: address.into(),
            region_code: Some("41220".into()),
            total_units: 1050,
            contact: "16001234".into(),
            announced_on: NaiveDate::from_ymd_opt(2025, 6, 13).unwrap(),
            special_supply: DateRange::new(d(6, 23), d(6, 23)),
            rank1_local: DateRange::new(d(6, 24), d(6, 24)),
            rank1_other: DateRange::new(d(6, 24), d(6, 24)),
            rank2_local: DateRange::new(d(6, 25), d(6, 25)),
            rank2_other: DateRange::new(d(6, 25), d(6, 25)),
            application_end: d(6, 25),
            winners_announced_on: d(7, 1),
            contract: DateRange::new(d(7, 12), d(7, 15)),
            developer: "평택진위개발".into(),
            constructor: "한양".into(),
            homepage_url: Some("https://brain-sujain.co.kr".into()),
            detail_url: "https://www.applyhome.co.kr/detail?no=2025000199".into(),
        }
    }

    pub(crate) fn detail(address: &str) -> ListingDetail {
        let mut b = UnitTypeBuilder::new("059.7537A", 79.3049, 11, 6, 17);
        b.special_categories([1, 2, 1, 0, 0, 1, 1, 0, 0]).price(40_900);
        ListingDetail {
            summary: summary(address),
            units: [b.build()].into_iter().collect(),
            average_price: ComplexPrice::PerPyeong(1708),
            layout: "applyhome-headers-v2",
        }
    }

    #[test]
    fn record_uses_korean_field_names() {
        let report = assemble(
            detail("경기도 평택시 진위면 갈곶리 239-60번지 일원"),
            Comparison::NoData { skipped: 0 },
        );
        let record = report.to_record().unwrap();
        assert_eq!(record["단지명"], "브레인시티 수자인");
        assert_eq!(record["모집공고일"], "2025-06-13");
        assert_eq!(record["단지 평균 평당가"], 1708);
        assert_eq!(record["읍면동"], "진위면");
        assert_eq!(record["주변 시세 평균 평당가"]["status"], "no_data");
        assert_eq!(
            record["평형별 공급대상 및 분양가"]["059.7537A"]["특별 공급세대수"]["신혼부부"],
            2
        );
    }

    #[test]
    fn short_address_has_unknown_sub_district() {
        let report = assemble(detail("세종특별자치시 집현동"), Comparison::NoData { skipped: 0 });
        assert_eq!(report.sub_district, "unknown");
    }

    #[test]
    fn comparison_from_trade_average() {
        let available = Comparison::from(TradeAverage::Available(RegionAveragePrice {
            region_code: "41220".into(),
            sub_district: "진위면".into(),
            months: vec!["202506".into()],
            sample_count: 4,
            skipped: 0,
            average: 1523.45,
        }));
        assert_eq!(available.average(), Some(1523.45));
        let json = serde_json::to_value(&available).unwrap();
        assert_eq!(json["sample_count"], 4);
        assert_eq!(json["skipped"], 0);

        let json = serde_json::to_value(Comparison::unavailable("timeout")).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "timeout");
    }

    #[test]
    fn insufficient_price_serializes_as_null() {
        let mut d = detail("경기도 평택시 진위면");
        d.average_price = ComplexPrice::InsufficientData;
        let record = assemble(d, Comparison::NoData { skipped: 0 }).to_record().unwrap();
        assert!(record["단지 평균 평당가"].is_null());
    }

    #[test]
    fn skipped_deals_reach_the_record() {
        let partial = Comparison::from(TradeAverage::Available(RegionAveragePrice {
            region_code: "41220".into(),
            sub_district: "진위면".into(),
            months: vec!["202506".into()],
            sample_count: 1,
            skipped: 5,
            average: 2000.0,
        }));
        let record = assemble(detail("경기도 평택시 진위면"), partial)
            .to_record()
            .unwrap();
        assert_eq!(record["주변 시세 평균 평당가"]["status"], "available");
        assert_eq!(record["주변 시세 평균 평당가"]["skipped"], 5);

        let empty = Comparison::from(TradeAverage::NoData {
            months: vec!["202506".into()],
            skipped: 7,
        });
        assert_eq!(empty, Comparison::NoData { skipped: 7 });
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["skipped"], 7);
    }
}
