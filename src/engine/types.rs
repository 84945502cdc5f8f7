//! Core domain types for tag submission and progression

use serde::{Deserialize, Serialize};

/// Polarity of a tag: praise or complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagPolarity {
    #[serde(rename = "POSITIVE")]
    Positive,
    #[serde(rename = "NEGATIVE")]
    Negative,
}

impl TagPolarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagPolarity::Positive => "POSITIVE",
            TagPolarity::Negative => "NEGATIVE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "POSITIVE" => Some(TagPolarity::Positive),
            "NEGATIVE" => Some(TagPolarity::Negative),
            _ => None,
        }
    }
}

/// Geographic coordinate attached to a tag at submission time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized plate identity: 2-letter jurisdiction code plus plate string.
///
/// Normalization is uppercase with spaces and dashes stripped, so
/// "ny / abc-123" and "NY / ABC 123" resolve to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlateRef {
    pub jurisdiction: String,
    pub plate: String,
}

impl PlateRef {
    /// Build a normalized plate reference from raw user input
    pub fn normalize(jurisdiction: &str, plate: &str) -> Self {
        Self {
            jurisdiction: jurisdiction.trim().to_uppercase(),
            plate: plate
                .trim()
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '-')
                .collect::<String>()
                .to_uppercase(),
        }
    }
}

impl std::fmt::Display for PlateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.jurisdiction, self.plate)
    }
}

/// One unit of driver feedback, immutable once persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagEvent {
    /// Client-generated unique id, used for retry idempotency
    pub id: String,
    pub target: PlateRef,
    pub creator_id: String,
    pub polarity: TagPolarity,
    pub reason: String,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    pub location: Option<GeoPoint>,
}

/// Per-polarity credit balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub positive_credits: i64,
    pub negative_credits: i64,
}

impl Balances {
    pub fn for_polarity(&self, polarity: TagPolarity) -> i64 {
        match polarity {
            TagPolarity::Positive => self.positive_credits,
            TagPolarity::Negative => self.negative_credits,
        }
    }
}

/// A registered user: balances, cumulative counters, and awarded badges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Own vehicle identity, absent for users without a registered plate
    pub plate: Option<PlateRef>,
    pub positive_credits: i64,
    pub negative_credits: i64,
    pub experience: i64,
    pub level: i32,
    pub positive_received: i64,
    pub negative_received: i64,
    pub total_given: i64,
    pub positive_given: i64,
    pub negative_given: i64,
    /// Badge ids held by this user, no duplicates
    pub badges: Vec<String>,
    pub created_at: i64,
}

impl User {
    /// New user with starting balances and no history
    pub fn new(id: &str, plate: Option<PlateRef>, starting_credits: Balances, now: i64) -> Self {
        Self {
            id: id.to_string(),
            plate,
            positive_credits: starting_credits.positive_credits,
            negative_credits: starting_credits.negative_credits,
            experience: 0,
            level: 1,
            positive_received: 0,
            negative_received: 0,
            total_given: 0,
            positive_given: 0,
            negative_given: 0,
            badges: Vec::new(),
            created_at: now,
        }
    }

    pub fn balances(&self) -> Balances {
        Balances {
            positive_credits: self.positive_credits,
            negative_credits: self.negative_credits,
        }
    }
}

/// Raw tag submission as received from the caller (UI/API layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSubmission {
    pub creator_id: String,
    pub plate: String,
    pub jurisdiction: String,
    pub polarity: TagPolarity,
    pub reason: String,
    pub location: Option<GeoPoint>,
    /// Client-generated tag id; generated server-side when absent
    pub client_tag_id: Option<String>,
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub tag_id: String,
    pub exp_gained: i64,
    pub leveled_up: bool,
    pub new_badges: Vec<String>,
    /// True when the tag id was already recorded and the chain was skipped
    pub duplicate: bool,
}
