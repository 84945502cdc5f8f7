//! Top-N rankings: most active taggers and most common reasons

use super::leaderboard::{sort_by_count, SortDirection};
use crate::engine::types::TagEvent;
use std::collections::HashMap;

/// Default truncation for ranked views
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TaggerCount {
    pub user_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u64,
}

/// Most active taggers: group by creator, rank descending, truncate to n
pub fn top_taggers(events: &[TagEvent], n: usize) -> Vec<TaggerCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<TaggerCount> = Vec::new();

    for event in events {
        match index.get(event.creator_id.as_str()) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(&event.creator_id, entries.len());
                entries.push(TaggerCount {
                    user_id: event.creator_id.clone(),
                    count: 1,
                });
            }
        }
    }

    sort_by_count(&mut entries, SortDirection::Desc, |e| e.count);
    entries.truncate(n);
    entries
}

/// Most common reasons, grouped by the exact reason string.
///
/// Grouping is exact (no fuzzy normalization): near-duplicate phrasings
/// count separately.
pub fn top_reasons(events: &[TagEvent], n: usize) -> Vec<ReasonCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<ReasonCount> = Vec::new();

    for event in events {
        match index.get(event.reason.as_str()) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(&event.reason, entries.len());
                entries.push(ReasonCount {
                    reason: event.reason.clone(),
                    count: 1,
                });
            }
        }
    }

    sort_by_count(&mut entries, SortDirection::Desc, |e| e.count);
    entries.truncate(n);
    entries
}
