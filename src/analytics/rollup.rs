//! Scalar rollups: totals, percentage splits, rolling windows

use chrono::{FixedOffset, TimeZone};

use crate::engine::types::{TagEvent, TagPolarity};

/// Headline numbers over the full event history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupSummary {
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    /// round(positive / total * 100), 0 when total is 0
    pub positive_pct: u32,
    pub negative_pct: u32,
    /// Events since local midnight
    pub today: u64,
    pub last_7_days: u64,
    pub last_30_days: u64,
}

/// Percentage of `part` in `total`, rounded; 0 for an empty total
pub fn percentage(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Unix timestamp of the most recent local midnight before `now`
fn local_midnight(tz: FixedOffset, now: i64) -> i64 {
    match tz.timestamp_opt(now, 0).single() {
        Some(local) => local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| tz.from_local_datetime(&midnight).single())
            .map(|midnight| midnight.timestamp())
            .unwrap_or(now),
        None => now,
    }
}

/// Compute the rollup summary for an event history at time `now`
pub fn summarize(events: &[TagEvent], tz: FixedOffset, now: i64) -> RollupSummary {
    let total = events.len() as u64;
    let positive = events
        .iter()
        .filter(|e| e.polarity == TagPolarity::Positive)
        .count() as u64;
    let negative = total - positive;

    let midnight = local_midnight(tz, now);
    let count_since = |cutoff: i64| {
        events
            .iter()
            .filter(|e| e.created_at >= cutoff && e.created_at <= now)
            .count() as u64
    };

    RollupSummary {
        total,
        positive,
        negative,
        positive_pct: percentage(positive, total),
        negative_pct: percentage(negative, total),
        today: count_since(midnight),
        last_7_days: count_since(now - 7 * 86_400),
        last_30_days: count_since(now - 30 * 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::make_event;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    /// 2023-11-13 00:00 UTC (a Monday)
    const MONDAY_MIDNIGHT: i64 = 1699833600;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn test_summary_splits_and_windows() {
        let now = MONDAY_MIDNIGHT + 12 * 3600; // Monday noon
        let events = vec![
            // Today
            make_event("t1", "NY", "AAA111", TagPolarity::Positive, MONDAY_MIDNIGHT + 3600),
            // 3 days ago
            make_event("t2", "NY", "AAA111", TagPolarity::Negative, now - 3 * 86_400),
            // 20 days ago
            make_event("t3", "NY", "BBB222", TagPolarity::Negative, now - 20 * 86_400),
            // 40 days ago, outside every rolling window
            make_event("t4", "NY", "BBB222", TagPolarity::Negative, now - 40 * 86_400),
        ];

        let summary = summarize(&events, utc(), now);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.positive, 1);
        assert_eq!(summary.negative, 3);
        assert_eq!(summary.positive_pct, 25);
        assert_eq!(summary.negative_pct, 75);
        assert_eq!(summary.today, 1);
        assert_eq!(summary.last_7_days, 2);
        assert_eq!(summary.last_30_days, 3);
    }

    #[test]
    fn test_summary_empty_history() {
        let summary = summarize(&[], utc(), MONDAY_MIDNIGHT);

        assert_eq!(summary.total, 0);
        assert_eq!(summary.positive_pct, 0);
        assert_eq!(summary.negative_pct, 0);
        assert_eq!(summary.today, 0);
    }

    #[test]
    fn test_today_respects_offset() {
        // 23:30 UTC Sunday is 01:30 Monday at +02:00, so an event from
        // 23:00 UTC Sunday falls inside "today" for that offset.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = MONDAY_MIDNIGHT - 1800; // 23:30 UTC Sunday
        let events = vec![make_event(
            "t1",
            "NY",
            "AAA111",
            TagPolarity::Positive,
            MONDAY_MIDNIGHT - 3600, // 23:00 UTC Sunday
        )];

        let summary = summarize(&events, tz, now);
        assert_eq!(summary.today, 1);

        // At UTC the same moment is still Sunday, and midnight cuts it off
        let summary_utc = summarize(&events, utc(), now);
        assert_eq!(summary_utc.today, 1); // Sunday 23:00 >= Sunday midnight

        let monday_noon = MONDAY_MIDNIGHT + 12 * 3600;
        let summary_monday = summarize(&events, utc(), monday_noon);
        assert_eq!(summary_monday.today, 0);
    }
}
