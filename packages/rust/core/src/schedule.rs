//! Calendar-ready events for an announcement's application schedule.
//!
//! Events are plain data; writing them to a calendar is left to the caller.

use chrono::NaiveDate;
use serde::Serialize;

use cheongyak_shared::{DateRange, ListingSummary};

/// All announcement dates are local to Korea.
pub const TIME_ZONE: &str = "Asia/Seoul";

/// Which part of the schedule an event covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    SpecialSupply,
    Rank1Local,
    Rank1Other,
    Rank2Local,
    Rank2Other,
    WinnerAnnouncement,
    Contract,
}

impl ScheduleKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::SpecialSupply => "특별공급 청약접수",
            Self::Rank1Local => "1순위 해당지역 청약접수",
            Self::Rank1Other => "1순위 기타지역 청약접수",
            Self::Rank2Local => "2순위 해당지역 청약접수",
            Self::Rank2Other => "2순위 기타지역 청약접수",
            Self::WinnerAnnouncement => "당첨자 발표",
            Self::Contract => "계약",
        }
    }
}

/// One all-day calendar event (start and end inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEvent {
    pub kind: ScheduleKind,
    pub summary: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub time_zone: &'static str,
    pub location: String,
    pub description: String,
}

/// Events for every window of `listing` that has at least one known date,
/// in chronological schedule order.
pub fn schedule_events(listing: &ListingSummary) -> Vec<ScheduleEvent> {
    let winners = DateRange::new(listing.winners_announced_on, listing.winners_announced_on);
    let windows = [
        (ScheduleKind::SpecialSupply, listing.special_supply),
        (ScheduleKind::Rank1Local, listing.rank1_local),
        (ScheduleKind::Rank1Other, listing.rank1_other),
        (ScheduleKind::Rank2Local, listing.rank2_local),
        (ScheduleKind::Rank2Other, listing.rank2_other),
        (ScheduleKind::WinnerAnnouncement, winners),
        (ScheduleKind::Contract, listing.contract),
    ];

    windows
        .into_iter()
        .filter_map(|(kind, range)| {
            // A window with one known side collapses to that single day.
            let start = range.start.or(range.end)?;
            let end = range.end.unwrap_or(start);
            Some(ScheduleEvent {
                kind,
                summary: format!("[청약] {} {}", listing.complex_name, kind.label()),
                start,
                end,
                time_zone: TIME_ZONE,
                location: listing.address.clone(),
                description: describe(listing, kind, start, end),
            })
        })
        .collect()
}

fn describe(listing: &ListingSummary, kind: ScheduleKind, start: NaiveDate, end: NaiveDate) -> String {
    let when = if start == end {
        start.to_string()
    } else {
        format!("{start} ~ {end}")
    };
    let mut text = format!(
        "{} {}: {when}\n공급위치: {}\n공급규모: {}세대\n문의처: {}\n분양공고: {}",
        listing.complex_name,
        kind.label(),
        listing.address,
        listing.total_units,
        listing.contact,
        listing.detail_url,
    );
    if let Some(home) = &listing.homepage_url {
        text.push_str(&format!("\n홍보 페이지: {home}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::tests::summary;

    #[test]
    fn one_event_per_known_window() {
        let listing = summary("경기도 평택시 진위면 갈곶리");
        let events = schedule_events(&listing);
        let kinds: Vec<ScheduleKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ScheduleKind::SpecialSupply,
                ScheduleKind::Rank1Local,
                ScheduleKind::Rank1Other,
                ScheduleKind::Rank2Local,
                ScheduleKind::Rank2Other,
                ScheduleKind::WinnerAnnouncement,
                ScheduleKind::Contract,
            ]
        );
        let contract = events.last().unwrap();
        assert_eq!(contract.start.to_string(), "2025-07-12");
        assert_eq!(contract.end.to_string(), "2025-07-15");
        assert_eq!(contract.time_zone, "Asia/Seoul");
        assert!(contract.summary.contains("브레인시티 수자인"));
        assert!(contract.description.contains("2025-07-12 ~ 2025-07-15"));
    }

    #[test]
    fn empty_windows_are_skipped_and_half_windows_collapse() {
        let mut listing = summary("경기도 평택시 진위면");
        listing.rank2_local = DateRange::default();
        listing.rank2_other = DateRange::default();
        listing.winners_announced_on = None;
        listing.contract = DateRange::new(None, NaiveDate::from_ymd_opt(2025, 7, 15));

        let events = schedule_events(&listing);
        assert_eq!(events.len(), 4);
        let contract = events.last().unwrap();
        assert_eq!(contract.kind, ScheduleKind::Contract);
        assert_eq!(contract.start, contract.end);
    }
}
