//! Badge catalog and rule evaluation
//!
//! Badges are permanent achievements unlocked when a user's cumulative
//! counters cross catalog-defined thresholds. The catalog is compiled in
//! and read-only; evaluation order is catalog order, which makes the set
//! of newly awarded badges deterministic for a given counter snapshot.

use super::types::User;
use std::collections::HashSet;

/// Counter a simple badge criterion reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    GivenCount,
    PositiveGivenCount,
    PositiveReceivedCount,
    NegativeReceivedCount,
    ExperienceEarned,
}

/// Closed set of badge criteria.
///
/// `Balanced` requires both received counters at or above the threshold
/// with their difference inside the closeness bound. It is an ordinary
/// variant, not a special-cased badge id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCriterion {
    Simple { counter: CounterKind, threshold: i64 },
    Balanced { threshold: i64, closeness: i64 },
}

/// Static catalog entry
#[derive(Debug, Clone, Copy)]
pub struct BadgeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub criterion: BadgeCriterion,
}

/// The badge catalog, in evaluation (and award) order
pub static CATALOG: [BadgeDef; 12] = [
    BadgeDef {
        id: "first_tag",
        name: "First Tag",
        description: "Submit your first tag",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::GivenCount,
            threshold: 1,
        },
    },
    BadgeDef {
        id: "road_regular",
        name: "Road Regular",
        description: "Submit 10 tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::GivenCount,
            threshold: 10,
        },
    },
    BadgeDef {
        id: "road_veteran",
        name: "Road Veteran",
        description: "Submit 50 tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::GivenCount,
            threshold: 50,
        },
    },
    BadgeDef {
        id: "road_legend",
        name: "Road Legend",
        description: "Submit 100 tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::GivenCount,
            threshold: 100,
        },
    },
    BadgeDef {
        id: "good_samaritan",
        name: "Good Samaritan",
        description: "Give 10 positive tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::PositiveGivenCount,
            threshold: 10,
        },
    },
    BadgeDef {
        id: "kindness_streak",
        name: "Kindness Streak",
        description: "Give 50 positive tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::PositiveGivenCount,
            threshold: 50,
        },
    },
    BadgeDef {
        id: "crowd_favorite",
        name: "Crowd Favorite",
        description: "Receive 10 positive tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::PositiveReceivedCount,
            threshold: 10,
        },
    },
    BadgeDef {
        id: "beloved",
        name: "Beloved",
        description: "Receive 50 positive tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::PositiveReceivedCount,
            threshold: 50,
        },
    },
    BadgeDef {
        id: "marked_driver",
        name: "Marked Driver",
        description: "Receive 10 negative tags",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::NegativeReceivedCount,
            threshold: 10,
        },
    },
    BadgeDef {
        id: "seasoned",
        name: "Seasoned",
        description: "Earn 1000 experience",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::ExperienceEarned,
            threshold: 1000,
        },
    },
    BadgeDef {
        id: "road_scholar",
        name: "Road Scholar",
        description: "Earn 5000 experience",
        criterion: BadgeCriterion::Simple {
            counter: CounterKind::ExperienceEarned,
            threshold: 5000,
        },
    },
    BadgeDef {
        id: "balanced_karma",
        name: "Balanced Karma",
        description: "Receive 5 tags of each polarity, nearly evenly",
        criterion: BadgeCriterion::Balanced {
            threshold: 5,
            closeness: 2,
        },
    },
];

/// Snapshot of the counters badge criteria read
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSnapshot {
    pub total_given: i64,
    pub positive_given: i64,
    pub positive_received: i64,
    pub negative_received: i64,
    pub experience: i64,
}

impl CounterSnapshot {
    pub fn from_user(user: &User) -> Self {
        Self {
            total_given: user.total_given,
            positive_given: user.positive_given,
            positive_received: user.positive_received,
            negative_received: user.negative_received,
            experience: user.experience,
        }
    }

    fn counter(&self, kind: CounterKind) -> i64 {
        match kind {
            CounterKind::GivenCount => self.total_given,
            CounterKind::PositiveGivenCount => self.positive_given,
            CounterKind::PositiveReceivedCount => self.positive_received,
            CounterKind::NegativeReceivedCount => self.negative_received,
            CounterKind::ExperienceEarned => self.experience,
        }
    }
}

/// Whether a criterion is satisfied by a counter snapshot
pub fn satisfies(criterion: BadgeCriterion, counters: &CounterSnapshot) -> bool {
    match criterion {
        BadgeCriterion::Simple { counter, threshold } => counters.counter(counter) >= threshold,
        BadgeCriterion::Balanced { threshold, closeness } => {
            counters.negative_received >= threshold
                && counters.positive_received >= threshold
                && (counters.negative_received - counters.positive_received).abs() <= closeness
        }
    }
}

/// Badges newly satisfied by this snapshot, in catalog order.
///
/// Badges already held are never returned, so evaluating twice with no
/// counter change yields an empty set on the second call.
pub fn newly_satisfied(
    counters: &CounterSnapshot,
    awarded: &HashSet<String>,
) -> Vec<&'static BadgeDef> {
    CATALOG
        .iter()
        .filter(|def| !awarded.contains(def.id))
        .filter(|def| satisfies(def.criterion, counters))
        .collect()
}
