//! XML parsing for the apartment transaction API.
//!
//! The response looks like:
//!
//! ```xml
//! <response>
//!   <header><resultCode>000</resultCode><resultMsg>OK</resultMsg></header>
//!   <body>
//!     <items><item><umdNm>진위면</umdNm><excluUseAr>84.97</excluUseAr><dealAmount>45,000</dealAmount>...</item></items>
//!     <numOfRows>1000</numOfRows><pageNo>1</pageNo><totalCount>1</totalCount>
//!   </body>
//! </response>
//! ```

use serde::Deserialize;

use cheongyak_shared::{CheongyakError, PYEONG_FACTOR, Result};

/// Result codes the API uses for success (older deployments answer `00`).
const SUCCESS_CODES: [&str; 2] = ["000", "00"];

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Response {
    header: Header,
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "resultMsg", default)]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    items: Option<Items>,
    #[serde(rename = "totalCount", default)]
    total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Items {
    #[serde(rename = "item", default)]
    item: Vec<RawTrade>,
}

#[derive(Debug, Deserialize)]
struct RawTrade {
    #[serde(rename = "umdNm", default)]
    umd_nm: String,
    #[serde(rename = "excluUseAr", default)]
    exclu_use_ar: String,
    #[serde(rename = "dealAmount", default)]
    deal_amount: String,
}

// ---------------------------------------------------------------------------
// Parsed types
// ---------------------------------------------------------------------------

/// One transaction record, numbers still as upstream text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    /// Sub-district name (읍면동).
    pub sub_district: String,
    /// Exclusive-use area in m², e.g. `84.97`.
    pub area: String,
    /// Deal amount in 만원 with separators, e.g. `45,000`.
    pub amount: String,
}

/// A transaction with its derived price per pyeong.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionSample {
    pub area: f64,
    pub amount_manwon: u64,
    pub price_per_pyeong: f64,
}

impl TradeRecord {
    /// Derive `amount / (area / 3.3)`. Zero or unparsable areas are errors.
    pub fn to_sample(&self) -> Result<TransactionSample> {
        let area: f64 = self
            .area
            .trim()
            .parse()
            .map_err(|_| CheongyakError::parse(format!("invalid area '{}'", self.area)))?;
        if !area.is_finite() || area <= 0.0 {
            return Err(CheongyakError::parse(format!("non-positive area '{}'", self.area)));
        }
        let amount_manwon: u64 = self
            .amount
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect::<String>()
            .parse()
            .map_err(|_| CheongyakError::parse(format!("invalid deal amount '{}'", self.amount)))?;

        Ok(TransactionSample {
            area,
            amount_manwon,
            price_per_pyeong: amount_manwon as f64 / (area / PYEONG_FACTOR),
        })
    }
}

/// One page of the monthly transaction listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradePage {
    pub records: Vec<TradeRecord>,
    pub total_count: u64,
}

/// Parse one XML response page.
pub fn parse_page(xml: &str) -> Result<TradePage> {
    let response: Response = quick_xml::de::from_str(xml)
        .map_err(|e| CheongyakError::malformed(format!("transaction XML: {e}")))?;

    let code = response.header.result_code.trim();
    if !SUCCESS_CODES.contains(&code) {
        return Err(CheongyakError::UpstreamUnavailable(format!(
            "transaction API returned {code}: {}",
            response.header.result_msg.trim()
        )));
    }

    let Some(body) = response.body else {
        return Ok(TradePage::default());
    };
    let records = body
        .items
        .unwrap_or_default()
        .item
        .into_iter()
        .map(|raw| TradeRecord {
            sub_district: raw.umd_nm.trim().to_string(),
            area: raw.exclu_use_ar.trim().to_string(),
            amount: raw.deal_amount.trim().to_string(),
        })
        .collect();

    Ok(TradePage {
        records,
        total_count: body.total_count,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a response page from `(umdNm, excluUseAr, dealAmount)` triples.
    pub(crate) fn page_xml(items: &[(&str, &str, &str)], total_count: u64) -> String {
        let items: String = items
            .iter()
            .map(|(dong, area, amount)| {
                format!(
                    "<item><aptNm>테스트아파트</aptNm><dealAmount>{amount}</dealAmount>\
                     <excluUseAr>{area}</excluUseAr><umdNm>{dong}</umdNm></item>"
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <response><header><resultCode>000</resultCode><resultMsg>OK</resultMsg></header>\
             <body><items>{items}</items><numOfRows>1000</numOfRows><pageNo>1</pageNo>\
             <totalCount>{total_count}</totalCount></body></response>"
        )
    }

    #[test]
    fn parses_items_and_total() {
        let xml = page_xml(&[("진위면", "84.97", "    45,000"), ("고덕동", "59.9", "38,000")], 2);
        let page = parse_page(&xml).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].sub_district, "진위면");
        assert_eq!(page.records[0].amount, "45,000");
    }

    #[test]
    fn sample_price_per_pyeong() {
        let record = TradeRecord {
            sub_district: "진위면".into(),
            area: "66".into(),
            amount: "40,000".into(),
        };
        let sample = record.to_sample().unwrap();
        assert_eq!(sample.amount_manwon, 40_000);
        assert!((sample.price_per_pyeong - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn bad_numbers_are_errors() {
        let zero = TradeRecord {
            sub_district: "x".into(),
            area: "0".into(),
            amount: "1".into(),
        };
        assert!(zero.to_sample().is_err());
        let text = TradeRecord {
            sub_district: "x".into(),
            area: "84".into(),
            amount: "협의".into(),
        };
        assert!(text.to_sample().is_err());
    }

    #[test]
    fn empty_items_element() {
        let xml = "<response><header><resultCode>000</resultCode><resultMsg>OK</resultMsg></header>\
                   <body><items/><numOfRows>1000</numOfRows><pageNo>1</pageNo><totalCount>0</totalCount></body></response>";
        let page = parse_page(xml).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn error_result_code_is_upstream_failure() {
        let xml = "<response><header><resultCode>30</resultCode>\
                   <resultMsg>SERVICE KEY IS NOT REGISTERED ERROR.</resultMsg></header></response>";
        let err = parse_page(xml).unwrap_err();
        assert!(matches!(err, CheongyakError::UpstreamUnavailable(_)));
        assert!(err.to_string().contains("NOT REGISTERED"));
    }

    #[test]
    fn non_xml_is_malformed() {
        let err = parse_page("{\"error\": true}").unwrap_err();
        assert!(matches!(err, CheongyakError::MalformedResponse { .. }));
    }
}
