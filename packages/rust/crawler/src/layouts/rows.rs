//! Row-level parsing for the supply, special-supply and price tables.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use cheongyak_shared::{CheongyakError, Result, UnitTypeBuilder};

pub(crate) static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector"));
pub(crate) static TBODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("tbody selector"));
pub(crate) static TH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("th selector"));
static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("tr selector"));
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("td selector"));

/// Supply rows carry at least label, area, general, special, total and one trailing cell.
const SUPPLY_CELLS: usize = 6;
/// Special rows carry a label plus nine category counts.
const SPECIAL_CELLS: usize = 10;

/// Trimmed `td` texts of every row that has any `td` (heading-only rows are skipped).
pub(crate) fn data_rows(body: ElementRef<'_>) -> Vec<Vec<String>> {
    body.select(&TR)
        .map(|row| {
            row.select(&TD)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Parse the supply table into one builder per unit type, in row order.
///
/// The final row is a totals row and is dropped. Only the last six cells of a
/// row are read, since leading cells are row-spanned group labels.
pub(crate) fn parse_supply_rows(body: ElementRef<'_>) -> Result<Vec<UnitTypeBuilder>> {
    let mut rows = data_rows(body);
    rows.pop();

    rows.iter()
        .enumerate()
        .map(|(idx, cells)| {
            if cells.len() < SUPPLY_CELLS {
                return Err(CheongyakError::parse(format!(
                    "supply row {idx} has {} cells, expected at least {SUPPLY_CELLS}",
                    cells.len()
                )));
            }
            let c = &cells[cells.len() - SUPPLY_CELLS..];
            Ok(UnitTypeBuilder::new(
                c[0].as_str(),
                parse_area(&c[1])?,
                parse_count(&c[2])?,
                parse_count(&c[3])?,
                parse_count(&c[4])?,
            ))
        })
        .collect()
}

/// Fill special-supply categories into the matching builders.
pub(crate) fn apply_special_rows(
    body: ElementRef<'_>,
    builders: &mut [UnitTypeBuilder],
) -> Result<()> {
    for (idx, cells) in data_rows(body).iter().enumerate() {
        if cells.len() < SPECIAL_CELLS {
            return Err(CheongyakError::parse(format!(
                "special row {idx} has {} cells, expected at least {SPECIAL_CELLS}",
                cells.len()
            )));
        }
        let mut categories = [0u32; 9];
        for (slot, raw) in categories.iter_mut().zip(&cells[1..SPECIAL_CELLS]) {
            *slot = parse_count(raw)?;
        }
        find(builders, &cells[0], "special")?.special_categories(categories);
    }
    Ok(())
}

/// Fill listed prices into the matching builders.
pub(crate) fn apply_price_rows(body: ElementRef<'_>, builders: &mut [UnitTypeBuilder]) -> Result<()> {
    for (idx, cells) in data_rows(body).iter().enumerate() {
        if cells.len() < 2 {
            return Err(CheongyakError::parse(format!(
                "price row {idx} has {} cells, expected at least 2",
                cells.len()
            )));
        }
        let price = parse_price(&cells[1])?;
        find(builders, &cells[0], "price")?.price(price);
    }
    Ok(())
}

fn find<'b>(
    builders: &'b mut [UnitTypeBuilder],
    label: &str,
    table: &str,
) -> Result<&'b mut UnitTypeBuilder> {
    builders
        .iter_mut()
        .find(|b| b.label() == label)
        .ok_or_else(|| {
            CheongyakError::parse(format!("{table} row names unknown unit type '{label}'"))
        })
}

fn strip_separators(raw: &str) -> String {
    raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

/// Household counts; blank and `-` cells mean zero.
fn parse_count(raw: &str) -> Result<u32> {
    let cleaned = strip_separators(raw);
    if cleaned.is_empty() || cleaned == "-" {
        return Ok(0);
    }
    cleaned
        .parse()
        .map_err(|_| CheongyakError::parse(format!("invalid household count '{raw}'")))
}

fn parse_area(raw: &str) -> Result<f64> {
    strip_separators(raw)
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a >= 0.0)
        .ok_or_else(|| CheongyakError::parse(format!("invalid supply area '{raw}'")))
}

/// Prices in 만원 with thousands separators, e.g. `40,900` or `40,900 만원`.
fn parse_price(raw: &str) -> Result<u64> {
    let cleaned = strip_separators(raw);
    cleaned
        .trim_end_matches("만원")
        .parse()
        .map_err(|_| CheongyakError::parse(format!("invalid price '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn body(html: &str) -> Html {
        Html::parse_document(&format!("<table><tbody>{html}</tbody></table>"))
    }

    fn first_body(doc: &Html) -> ElementRef<'_> {
        doc.select(&TBODY).next().unwrap()
    }

    #[test]
    fn numbers_tolerate_separators() {
        assert_eq!(parse_price("40,900").unwrap(), 40_900);
        assert_eq!(parse_price("40,900 만원").unwrap(), 40_900);
        assert_eq!(parse_count("1,050").unwrap(), 1050);
        assert_eq!(parse_count("-").unwrap(), 0);
        assert!((parse_area("79.3049").unwrap() - 79.3049).abs() < 1e-9);
        assert!(parse_area("abc").is_err());
        assert!(parse_price("문의").is_err());
    }

    #[test]
    fn short_supply_row_is_an_error_not_a_panic() {
        let doc = body(
            "<tr><td>059A</td><td>79.3</td><td>11</td></tr><tr><td>합계</td></tr>",
        );
        let err = parse_supply_rows(first_body(&doc)).unwrap_err();
        assert!(err.to_string().contains("expected at least 6"));
    }

    #[test]
    fn supply_reads_trailing_six_cells_and_drops_totals() {
        let doc = body(
            "<tr><th>주택형</th></tr>\
             <tr><td>민영</td><td>059A</td><td>79.3</td><td>11</td><td>6</td><td>17</td><td>01</td></tr>\
             <tr><td>합계</td><td></td><td></td><td>11</td><td>6</td><td>17</td></tr>",
        );
        let builders = parse_supply_rows(first_body(&doc)).unwrap();
        assert_eq!(builders.len(), 1);
        let record = builders.into_iter().next().unwrap().build();
        assert_eq!(record.label, "059A");
        assert_eq!(record.general_supply, 11);
        assert_eq!(record.special.total, 6);
        assert_eq!(record.total_supply, 17);
    }

    #[test]
    fn special_row_for_unknown_unit_type_fails() {
        let mut builders = vec![UnitTypeBuilder::new("059A", 79.3, 11, 6, 17)];
        let doc = body(
            "<tr><td>084B</td><td>1</td><td>1</td><td>1</td><td>1</td><td>1</td><td>1</td><td>0</td><td>0</td><td>0</td></tr>",
        );
        let err = apply_special_rows(first_body(&doc), &mut builders).unwrap_err();
        assert!(err.to_string().contains("084B"));
    }

    #[test]
    fn short_special_row_fails() {
        let mut builders = vec![UnitTypeBuilder::new("059A", 79.3, 11, 6, 17)];
        let doc = body("<tr><td>059A</td><td>1</td><td>2</td></tr>");
        assert!(apply_special_rows(first_body(&doc), &mut builders).is_err());
    }
}
