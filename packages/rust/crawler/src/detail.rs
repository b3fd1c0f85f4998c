//! Announcement detail page fetching and parsing.

use std::sync::Arc;

use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use cheongyak_shared::{CheongyakError, Result, UnitTypes};

use crate::http::HttpClient;
use crate::layouts::{LayoutRegistry, TableSet, rows, table_body_count};

/// Unit types parsed from one detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDetail {
    pub units: UnitTypes,
    /// Name of the layout that recognized the page.
    pub layout: &'static str,
    pub table_count: usize,
}

/// Parse a detail page body. `url` is carried into errors only.
///
/// Layouts that recognize the page are tried in priority order; if rows fail
/// to parse under one, the next is tried. The first layout's error is
/// reported when none succeed.
pub fn parse_detail(html: &str, url: &str, registry: &LayoutRegistry) -> Result<ParsedDetail> {
    let doc = Html::parse_document(html);
    let table_count = table_body_count(&doc);

    let mut first_error = None;
    for (layout, tables) in registry.candidates(&doc) {
        let units = match parse_tables(tables) {
            Ok(units) => units,
            Err(e) => {
                debug!(url, layout, error = %e, "rows rejected, trying next layout");
                first_error.get_or_insert(e);
                continue;
            }
        };

        for unit in units.iter().filter(|u| tables.special.is_some() && !u.special.is_consistent()) {
            warn!(
                url,
                label = %unit.label,
                total = unit.special.total,
                categories = unit.special.category_sum(),
                "special-supply categories do not add up to the total"
            );
        }

        debug!(url, layout, table_count, units = units.len(), "parsed detail page");
        return Ok(ParsedDetail {
            units,
            layout,
            table_count,
        });
    }

    Err(match first_error {
        Some(CheongyakError::ParseFailure { message }) => {
            CheongyakError::detail(url, table_count, message)
        }
        Some(other) => other,
        None => CheongyakError::detail(
            url,
            table_count,
            format!(
                "no table layout matched (tried {})",
                registry.names().join(", ")
            ),
        ),
    })
}

fn parse_tables(tables: TableSet<'_>) -> Result<UnitTypes> {
    let mut builders = rows::parse_supply_rows(tables.supply)?;
    if let Some(special) = tables.special {
        rows::apply_special_rows(special, &mut builders)?;
    }
    rows::apply_price_rows(tables.price, &mut builders)?;
    Ok(builders.into_iter().map(|b| b.build()).collect())
}

/// Fetches and parses detail pages. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DetailFetcher {
    http: HttpClient,
    registry: Arc<LayoutRegistry>,
}

impl DetailFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            registry: Arc::new(LayoutRegistry::new()),
        }
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<ParsedDetail> {
        let parsed_url = Url::parse(url)
            .map_err(|e| CheongyakError::detail(url, 0, format!("invalid detail URL: {e}")))?;
        let body = self.http.get_text(&parsed_url, &[], cancel).await?;
        parse_detail(&body, url, &self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::tests::load_fixture;
    use cheongyak_shared::{HttpConfig, SpecialCategory};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://www.applyhome.co.kr/ai/aia/selectAPTLttotPblancDetail.do";

    #[test]
    fn six_table_page_has_consistent_special_supply() {
        let html = load_fixture("applyhome_six_tables.html");
        let parsed = parse_detail(&html, URL, &LayoutRegistry::new()).unwrap();
        assert_eq!(parsed.layout, "applyhome-headers-v2");
        assert_eq!(parsed.table_count, 6);
        assert_eq!(parsed.units.len(), 2);

        for unit in &parsed.units {
            assert!(unit.special.is_consistent(), "{}", unit.label);
        }
        let a = parsed.units.get("059.7537A").unwrap();
        assert!((a.supply_area - 79.3049).abs() < 1e-9);
        assert_eq!(a.price_manwon, Some(40_900));
        assert_eq!(a.special.get(SpecialCategory::Newlywed), 2);
    }

    #[test]
    fn five_table_page_defaults_categories_to_zero() {
        let html = load_fixture("applyhome_five_tables.html");
        let parsed = parse_detail(&html, URL, &LayoutRegistry::new()).unwrap();
        assert_eq!(parsed.layout, "applyhome-positional-v1");
        let unit = parsed.units.get("084.9876A").unwrap();
        assert_eq!(unit.special.total, 10);
        assert_eq!(unit.special.category_sum(), 0);
        assert_eq!(unit.price_manwon, Some(152_000));
    }

    #[test]
    fn positional_six_tables_without_headers() {
        let html = r#"<html><body>
            <table><tbody><tr><td>2025000201</td></tr></tbody></table>
            <table><tbody><tr><td>경기도 평택시 진위면</td></tr></tbody></table>
            <table><tbody>
                <tr><td>059A</td><td>79.30</td><td>10</td><td>5</td><td>15</td><td></td></tr>
                <tr><td>합계</td><td></td><td>10</td><td>5</td><td>15</td><td></td></tr>
            </tbody></table>
            <table><tbody>
                <tr><td>059A</td><td>1</td><td>1</td><td>1</td><td>1</td><td>1</td><td>0</td><td>0</td><td>0</td><td>0</td></tr>
            </tbody></table>
            <table><tbody><tr><td>059A</td><td>39,500</td></tr></tbody></table>
            <table><tbody><tr><td>-</td></tr></tbody></table>
        </body></html>"#;
        let parsed = parse_detail(html, URL, &LayoutRegistry::new()).unwrap();
        assert_eq!(parsed.layout, "applyhome-positional-v1");
        let unit = parsed.units.get("059A").unwrap();
        assert!(unit.special.is_consistent());
        assert_eq!(unit.special.get(SpecialCategory::Youth), 1);
        assert_eq!(unit.price_manwon, Some(39_500));
    }

    #[test]
    fn too_few_tables_is_a_detail_error() {
        let html = "<html><body><table><tbody><tr><td>공고 없음</td></tr></tbody></table></body></html>";
        let err = parse_detail(html, URL, &LayoutRegistry::new()).unwrap_err();
        match err {
            CheongyakError::DetailParse {
                url, table_count, ..
            } => {
                assert_eq!(url, URL);
                assert_eq!(table_count, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn row_errors_carry_url_and_table_count() {
        let html = load_fixture("applyhome_six_tables.html").replace("40,900", "문의");
        let err = parse_detail(&html, URL, &LayoutRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            CheongyakError::DetailParse { table_count: 6, .. }
        ));
        assert!(err.to_string().contains("invalid price"));
    }

    #[test]
    fn falls_back_when_header_rows_do_not_parse() {
        let html = load_fixture("applyhome_price_notice.html");
        let parsed = parse_detail(&html, URL, &LayoutRegistry::new()).unwrap();
        assert_eq!(parsed.layout, "applyhome-positional-v1");
        assert_eq!(parsed.table_count, 6);
        let unit = parsed.units.get("074.9512A").unwrap();
        assert_eq!(unit.price_manwon, Some(61_500));
        assert!(unit.special.is_consistent());
        assert_eq!(unit.special.get(SpecialCategory::Newlywed), 3);
    }

    #[tokio::test]
    async fn fetch_sends_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/detail"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("applyhome_six_tables.html")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let url = format!("{}/detail", server.uri());
        let parsed = DetailFetcher::new(http)
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(parsed.units.len(), 2);

        let requests = server.received_requests().await.unwrap();
        let agent = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
        assert_eq!(agent, cheongyak_shared::BROWSER_USER_AGENT);
    }
}
