//! Plain-text rendering of a [`SubscriptionReport`].

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};

use crate::assembler::{Comparison, SubscriptionReport};

/// Placeholder for dates the announcement does not give.
const UNDECIDED: &str = "미정";

/// Render the basic Korean report. `generated_at` is printed verbatim.
pub fn render_text(report: &SubscriptionReport, generated_at: NaiveDateTime) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report, generated_at);
    out
}

fn write_report(
    out: &mut String,
    r: &SubscriptionReport,
    generated_at: NaiveDateTime,
) -> std::fmt::Result {
    writeln!(out, "🏢 {} 분양공고 분석 리포트", r.complex_name)?;
    writeln!(out)?;
    writeln!(out, "📊 기본 정보")?;
    writeln!(out, "• 단지명: {}", r.complex_name)?;
    writeln!(out, "• 공급위치: {}", r.address)?;
    writeln!(out, "• 공급규모: {}세대", r.total_units)?;
    writeln!(out, "• 문의처: {}", r.contact)?;
    writeln!(out, "• 모집공고일: {}", r.announced_on)?;
    writeln!(out)?;
    writeln!(out, "🏗️ 시행/시공 정보")?;
    writeln!(out, "• 시행사: {}", r.developer)?;
    writeln!(out, "• 시공사: {}", r.constructor)?;
    writeln!(out)?;
    writeln!(out, "📅 청약 일정")?;
    let windows = [
        ("특별공급", r.special_start, r.special_end),
        ("1순위 해당지역", r.rank1_local_start, r.rank1_local_end),
        ("1순위 기타지역", r.rank1_other_start, r.rank1_other_end),
        ("2순위 해당지역", r.rank2_local_start, r.rank2_local_end),
        ("2순위 기타지역", r.rank2_other_start, r.rank2_other_end),
    ];
    for (label, start, end) in windows {
        writeln!(out, "• {label}: {} ~ {}", date(start), date(end))?;
    }
    writeln!(out, "• 당첨자 발표: {}", date(r.winners_announced_on))?;
    writeln!(out, "• 계약기간: {} ~ {}", date(r.contract_start), date(r.contract_end))?;
    writeln!(out)?;
    writeln!(out, "🏠 평형별 공급 현황")?;
    if r.units.is_empty() {
        writeln!(out, "평형별 공급 정보가 없습니다.")?;
    }
    for unit in &r.units {
        writeln!(out, "• {} ({}㎡)", unit.label, unit.supply_area)?;
        writeln!(out, "  - 특별공급: {}세대", unit.special.total)?;
        writeln!(out, "  - 일반공급: {}세대", unit.general_supply)?;
        match unit.price_manwon {
            Some(price) => writeln!(out, "  - 분양가: {} 만원", thousands(price))?,
            None => writeln!(out, "  - 분양가: 정보 없음")?,
        }
    }
    writeln!(out)?;
    writeln!(out, "💰 가격 비교")?;
    match r.average_price {
        Some(avg) => writeln!(out, "• 단지 평균 평당가: {} 만원", thousands(avg))?,
        None => writeln!(out, "• 단지 평균 평당가: 산출 불가")?,
    }
    let nearby = match &r.comparison {
        Comparison::Available {
            average,
            sample_count,
            skipped: 0,
            ..
        } => format!("{average:.2} 만원 ({sample_count}건)"),
        Comparison::Available {
            average,
            sample_count,
            skipped,
            ..
        } => format!("{average:.2} 만원 ({sample_count}건, 오류 {skipped}건 제외)"),
        Comparison::NoData { skipped: 0 } => "최근 거래 없음".to_string(),
        Comparison::NoData { skipped } => format!("최근 거래 없음 (오류 {skipped}건 제외)"),
        Comparison::Unavailable { reason } => format!("조회 실패 ({reason})"),
    };
    writeln!(out, "• 주변 시세 평균 평당가 ({}): {nearby}", r.sub_district)?;
    writeln!(out)?;
    writeln!(out, "🔗 관련 링크")?;
    writeln!(
        out,
        "• 아파트 홍보: {}",
        r.homepage_url.as_deref().unwrap_or("정보 없음")
    )?;
    writeln!(out, "• 분양공고: {}", r.detail_url)?;
    writeln!(out)?;
    writeln!(out, "📌 리포트 생성일시")?;
    write!(out, "{}", generated_at.format("%Y-%m-%d %H:%M:%S"))
}

fn date(d: Option<NaiveDate>) -> String {
    d.map_or_else(|| UNDECIDED.to_string(), |d| d.to_string())
}

/// `40900` → `40,900`.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::assembler::tests::detail;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 16)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(40_900), "40,900");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn report_sections_and_timestamp() {
        let report = assemble(
            detail("경기도 평택시 진위면 갈곶리"),
            Comparison::Available {
                average: 1523.4,
                sample_count: 12,
                skipped: 0,
                months: vec!["202506".into()],
            },
        );
        let text = render_text(&report, generated_at());
        assert!(text.starts_with("🏢 브레인시티 수자인 분양공고 분석 리포트"));
        assert!(text.contains("• 공급규모: 1050세대"));
        assert!(text.contains("• 특별공급: 2025-06-23 ~ 2025-06-23"));
        assert!(text.contains("• 059.7537A (79.3049㎡)"));
        assert!(text.contains("  - 분양가: 40,900 만원"));
        assert!(text.contains("• 주변 시세 평균 평당가 (진위면): 1523.40 만원 (12건)"));
        assert!(text.ends_with("2025-06-16 09:30:00"));
    }

    #[test]
    fn missing_values_have_placeholders() {
        let mut report = assemble(detail("경기도 평택시 진위면"), Comparison::unavailable("timeout"));
        report.winners_announced_on = None;
        report.homepage_url = None;
        let text = render_text(&report, generated_at());
        assert!(text.contains("• 당첨자 발표: 미정"));
        assert!(text.contains("• 아파트 홍보: 정보 없음"));
        assert!(text.contains("조회 실패 (timeout)"));
    }

    #[test]
    fn skipped_deals_are_shown() {
        let report = assemble(
            detail("경기도 평택시 진위면"),
            Comparison::Available {
                average: 2000.0,
                sample_count: 1,
                skipped: 5,
                months: vec!["202506".into()],
            },
        );
        let text = render_text(&report, generated_at());
        assert!(text.contains("2000.00 만원 (1건, 오류 5건 제외)"));

        let report = assemble(detail("경기도 평택시 진위면"), Comparison::NoData { skipped: 7 });
        assert!(render_text(&report, generated_at()).contains("최근 거래 없음 (오류 7건 제외)"));
    }
}
