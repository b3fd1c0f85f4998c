//! Header-driven layout: tables are identified by their `th` text.

use scraper::{ElementRef, Html};

use super::rows::{TABLE, TBODY, TH};
use super::{TableLayout, TableSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Supply,
    Special,
    Price,
}

/// Classify a table by its header cells.
///
/// Every role needs a `주택형` column. Special is checked before price and
/// supply since it may also carry area columns.
fn classify(headers: &[String]) -> Option<Role> {
    let has = |needle: &str| headers.iter().any(|h| h.contains(needle));
    if !headers.iter().any(|h| h.starts_with("주택형")) {
        return None;
    }
    if has("다자녀") {
        Some(Role::Special)
    } else if headers.iter().any(|h| is_price_header(h)) {
        Some(Role::Price)
    } else if has("공급면적") {
        Some(Role::Supply)
    } else {
        None
    }
}

/// `공급금액`, `분양가` or `분양가(최고가 기준)`, but not `분양가상한제`.
fn is_price_header(cell: &str) -> bool {
    ["공급금액", "분양가"].iter().any(|prefix| {
        cell.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['(', ' ']))
    })
}

fn header_cells(table: ElementRef<'_>) -> Vec<String> {
    table
        .select(&TH)
        .map(|th| {
            th.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Current applyhome detail page, recognized by header text.
pub struct HeaderLayout;

impl TableLayout for HeaderLayout {
    fn name(&self) -> &'static str {
        "applyhome-headers-v2"
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<TableSet<'a>> {
        let mut supply = None;
        let mut special = None;
        let mut price = None;

        for table in doc.select(&TABLE) {
            let Some(role) = classify(&header_cells(table)) else {
                continue;
            };
            let Some(body) = table.select(&TBODY).next() else {
                continue;
            };
            let slot = match role {
                Role::Supply => &mut supply,
                Role::Special => &mut special,
                Role::Price => &mut price,
            };
            slot.get_or_insert(body);
        }

        Some(TableSet {
            supply: supply?,
            special,
            price: price?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(headers: &[&str]) -> Vec<String> {
        headers.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn classification_prefers_specific_roles() {
        assert_eq!(classify(&cells(&["주택형", "주택공급면적", "일반", "특별", "계"])), Some(Role::Supply));
        assert_eq!(classify(&cells(&["주택형", "다자녀가구", "신혼부부"])), Some(Role::Special));
        assert_eq!(classify(&cells(&["주택형", "공급금액(최고가 기준)"])), Some(Role::Price));
        assert_eq!(classify(&cells(&["주택형", "분양가"])), Some(Role::Price));
        assert_eq!(classify(&cells(&["공급위치", "공급규모"])), None);
    }

    #[test]
    fn price_cap_notice_is_not_a_price_table() {
        assert_eq!(classify(&cells(&["분양가상한제", "정비사업"])), None);
        assert_eq!(classify(&cells(&["주택형", "분양가상한제"])), None);
        assert!(is_price_header("분양가 (만원)"));
        assert!(!is_price_header("분양가상한제"));
    }

    #[test]
    fn price_column_without_unit_type_is_ignored() {
        assert_eq!(classify(&cells(&["구분", "공급금액"])), None);
    }

    #[test]
    fn missing_price_table_is_not_recognized() {
        let doc = Html::parse_document(
            "<table><thead><tr><th>주택형</th><th>공급면적</th></tr></thead>\
             <tbody><tr><td>059A</td><td>79.3</td></tr></tbody></table>",
        );
        assert!(HeaderLayout.locate(&doc).is_none());
    }
}
