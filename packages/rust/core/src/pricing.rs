//! Complex-wide average listed price per pyeong.

use cheongyak_shared::{AreaMode, ComplexPrice, PYEONG_FACTOR, UnitTypes};

/// `round(Σ price / (Σ area / 3.3))` over unit types that have a listed price.
///
/// In [`AreaMode::Truncated`] each supply area contributes only its integer
/// part. Returns [`ComplexPrice::InsufficientData`] when the summed area is zero.
pub fn average_price_per_pyeong(units: &UnitTypes, mode: AreaMode) -> ComplexPrice {
    let (price_sum, area_sum) = units
        .iter()
        .filter_map(|unit| unit.price_manwon.map(|price| (price, unit.supply_area)))
        .fold((0u64, 0f64), |(prices, areas), (price, area)| {
            let area = match mode {
                AreaMode::Truncated => area.trunc(),
                AreaMode::Exact => area,
            };
            (prices + price, areas + area)
        });

    if area_sum <= 0.0 {
        return ComplexPrice::InsufficientData;
    }

    let per_pyeong = price_sum as f64 / (area_sum / PYEONG_FACTOR);
    ComplexPrice::PerPyeong(per_pyeong.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheongyak_shared::UnitTypeBuilder;

    fn units(rows: &[(&str, f64, Option<u64>)]) -> UnitTypes {
        rows.iter()
            .map(|(label, area, price)| {
                let mut b = UnitTypeBuilder::new(*label, *area, 10, 5, 15);
                if let Some(p) = price {
                    b.price(*p);
                }
                b.build()
            })
            .collect()
    }

    #[test]
    fn truncated_areas_match_published_formula() {
        let u = units(&[("A", 79.3, Some(40_900)), ("B", 79.1, Some(38_800))]);
        let expected = ((40_900.0_f64 + 38_800.0) / ((79.0 + 79.0) / 3.3)).round() as u64;
        assert_eq!(
            average_price_per_pyeong(&u, AreaMode::Truncated),
            ComplexPrice::PerPyeong(expected)
        );
        assert_eq!(expected, 1665);
    }

    #[test]
    fn exact_mode_uses_full_area() {
        let u = units(&[("A", 79.3, Some(40_900)), ("B", 79.1, Some(38_800))]);
        let expected = ((40_900.0_f64 + 38_800.0) / ((79.3 + 79.1) / 3.3)).round() as u64;
        assert_eq!(
            average_price_per_pyeong(&u, AreaMode::Exact),
            ComplexPrice::PerPyeong(expected)
        );
    }

    #[test]
    fn zero_area_is_insufficient() {
        let u = units(&[("A", 0.4, Some(40_900))]);
        assert_eq!(
            average_price_per_pyeong(&u, AreaMode::Truncated),
            ComplexPrice::InsufficientData
        );
        assert_eq!(
            average_price_per_pyeong(&UnitTypes::new(), AreaMode::Exact),
            ComplexPrice::InsufficientData
        );
    }

    #[test]
    fn unpriced_units_are_left_out() {
        let priced = units(&[("A", 79.3, Some(40_900))]);
        let mixed = units(&[("A", 79.3, Some(40_900)), ("B", 120.0, None)]);
        assert_eq!(
            average_price_per_pyeong(&priced, AreaMode::Truncated),
            average_price_per_pyeong(&mixed, AreaMode::Truncated)
        );
    }
}
