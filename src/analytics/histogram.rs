//! Time-bucketed histograms over the tag-event history

use chrono::{Datelike, FixedOffset, TimeZone, Timelike};

use crate::engine::types::TagEvent;

/// Trailing window for the weekday histogram, in days
pub const WEEKDAY_WINDOW_DAYS: i64 = 7;

/// Count events per hour of day (24 buckets, local time)
pub fn hour_of_day(events: &[TagEvent], tz: FixedOffset) -> [u64; 24] {
    let mut buckets = [0u64; 24];

    for event in events {
        if let Some(local) = tz.timestamp_opt(event.created_at, 0).single() {
            buckets[local.hour() as usize] += 1;
        }
    }

    buckets
}

/// Count events per weekday (Monday-first) over the trailing window
/// ending at `now`
pub fn day_of_week(events: &[TagEvent], tz: FixedOffset, now: i64) -> [u64; 7] {
    let mut buckets = [0u64; 7];
    let cutoff = now - WEEKDAY_WINDOW_DAYS * 86_400;

    for event in events {
        if event.created_at < cutoff || event.created_at > now {
            continue;
        }
        if let Some(local) = tz.timestamp_opt(event.created_at, 0).single() {
            buckets[local.weekday().num_days_from_monday() as usize] += 1;
        }
    }

    buckets
}

/// Index of the bucket with the maximum count; earliest index wins ties.
/// Returns `None` when every bucket is empty.
pub fn peak_bucket(buckets: &[u64]) -> Option<usize> {
    let max = *buckets.iter().max()?;
    if max == 0 {
        return None;
    }
    buckets.iter().position(|&count| count == max)
}
