//! Leaderboards over the tag-event history and user roster

use crate::engine::types::{PlateRef, TagEvent, TagPolarity, User};
use std::collections::HashMap;

/// Sort direction for ranked views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// One plate's standing on the leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCount {
    pub plate: PlateRef,
    pub count: u64,
}

/// Group tag events by target plate and rank by count.
///
/// Ties keep first-seen order: grouping preserves the order plates first
/// appear in the event history and the sort is stable.
pub fn plate_leaderboard(
    events: &[TagEvent],
    polarity: Option<TagPolarity>,
    direction: SortDirection,
) -> Vec<PlateCount> {
    let mut index: HashMap<&PlateRef, usize> = HashMap::new();
    let mut entries: Vec<PlateCount> = Vec::new();

    for event in events {
        if let Some(polarity) = polarity {
            if event.polarity != polarity {
                continue;
            }
        }

        match index.get(&event.target) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(&event.target, entries.len());
                entries.push(PlateCount {
                    plate: event.target.clone(),
                    count: 1,
                });
            }
        }
    }

    sort_by_count(&mut entries, direction, |e| e.count);
    entries
}

/// One user's standing on the experience leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceRank {
    pub user_id: String,
    pub experience: i64,
    pub level: i32,
}

/// Rank users by cumulative experience; roster order breaks ties
pub fn experience_leaderboard(users: &[User], direction: SortDirection) -> Vec<ExperienceRank> {
    let mut entries: Vec<ExperienceRank> = users
        .iter()
        .map(|u| ExperienceRank {
            user_id: u.id.clone(),
            experience: u.experience,
            level: u.level,
        })
        .collect();

    match direction {
        SortDirection::Asc => entries.sort_by_key(|e| e.experience),
        SortDirection::Desc => entries.sort_by_key(|e| std::cmp::Reverse(e.experience)),
    }
    entries
}

/// Stable count sort shared by the grouped rankings
pub(crate) fn sort_by_count<T, F: Fn(&T) -> u64>(entries: &mut [T], direction: SortDirection, count: F) {
    match direction {
        SortDirection::Asc => entries.sort_by_key(|e| count(e)),
        SortDirection::Desc => entries.sort_by_key(|e| std::cmp::Reverse(count(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{make_event, make_user};

    #[test]
    fn test_plate_leaderboard_counts_and_sorts() {
        let events = vec![
            make_event("t1", "NY", "AAA111", TagPolarity::Negative, 1000),
            make_event("t2", "NY", "BBB222", TagPolarity::Negative, 1001),
            make_event("t3", "NY", "AAA111", TagPolarity::Positive, 1002),
            make_event("t4", "NY", "AAA111", TagPolarity::Negative, 1003),
        ];

        let board = plate_leaderboard(&events, None, SortDirection::Desc);

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].plate.plate, "AAA111");
        assert_eq!(board[0].count, 3);
        assert_eq!(board[1].count, 1);

        // Sum of group counts equals the number of events
        let total: u64 = board.iter().map(|e| e.count).sum();
        assert_eq!(total as usize, events.len());
    }

    #[test]
    fn test_plate_leaderboard_polarity_filter() {
        let events = vec![
            make_event("t1", "NY", "AAA111", TagPolarity::Negative, 1000),
            make_event("t2", "NY", "AAA111", TagPolarity::Positive, 1001),
            make_event("t3", "NY", "BBB222", TagPolarity::Positive, 1002),
        ];

        let board = plate_leaderboard(&events, Some(TagPolarity::Positive), SortDirection::Desc);

        let total: u64 = board.iter().map(|e| e.count).sum();
        assert_eq!(total, 2);
        assert!(board.iter().all(|e| e.count == 1));
    }

    #[test]
    fn test_desc_then_asc_reverses_without_ties() {
        let events = vec![
            make_event("t1", "NY", "AAA111", TagPolarity::Negative, 1000),
            make_event("t2", "NY", "BBB222", TagPolarity::Negative, 1001),
            make_event("t3", "NY", "BBB222", TagPolarity::Negative, 1002),
            make_event("t4", "NY", "CCC333", TagPolarity::Negative, 1003),
            make_event("t5", "NY", "CCC333", TagPolarity::Negative, 1004),
            make_event("t6", "NY", "CCC333", TagPolarity::Negative, 1005),
        ];

        let desc = plate_leaderboard(&events, None, SortDirection::Desc);
        let mut asc = plate_leaderboard(&events, None, SortDirection::Asc);
        asc.reverse();

        assert_eq!(desc, asc);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let events = vec![
            make_event("t1", "NY", "BBB222", TagPolarity::Negative, 1000),
            make_event("t2", "NY", "AAA111", TagPolarity::Negative, 1001),
        ];

        let board = plate_leaderboard(&events, None, SortDirection::Desc);

        // Both count 1; BBB222 appeared first in the history
        assert_eq!(board[0].plate.plate, "BBB222");
        assert_eq!(board[1].plate.plate, "AAA111");
    }

    #[test]
    fn test_experience_leaderboard_roster_tie_order() {
        let mut alpha = make_user("alpha");
        alpha.experience = 500;
        let mut beta = make_user("beta");
        beta.experience = 500;
        let mut gamma = make_user("gamma");
        gamma.experience = 900;

        let board = experience_leaderboard(&[alpha, beta, gamma], SortDirection::Desc);

        assert_eq!(board[0].user_id, "gamma");
        // Tied users keep roster order
        assert_eq!(board[1].user_id, "alpha");
        assert_eq!(board[2].user_id, "beta");
    }
}
