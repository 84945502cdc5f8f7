//! Submission validation: format and business rules checked before any write

use super::types::{GeoPoint, PlateRef, TagPolarity, TagSubmission, User};

/// Accepted plate length range after normalization
pub const PLATE_MIN_LEN: usize = 3;
pub const PLATE_MAX_LEN: usize = 8;

/// Recognized 2-letter jurisdiction codes (US states plus DC)
const JURISDICTIONS: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

/// Validation failures, surfaced to the caller before any write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidJurisdiction,
    InvalidPlate,
    MissingReason,
    SelfTagRejected,
    InsufficientBalance,
}

impl ValidationError {
    /// Actionable message for the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::InvalidJurisdiction => "Select a state for the plate you're tagging.",
            ValidationError::InvalidPlate => "That doesn't look like a valid plate number.",
            ValidationError::MissingReason => "Add a short reason for your tag.",
            ValidationError::SelfTagRejected => "You can't tag your own plate.",
            ValidationError::InsufficientBalance => {
                "You don't have any credits of that kind left. Visit the shop to get more."
            }
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidJurisdiction => write!(f, "unrecognized jurisdiction code"),
            ValidationError::InvalidPlate => write!(f, "plate length out of accepted range"),
            ValidationError::MissingReason => write!(f, "reason must not be empty"),
            ValidationError::SelfTagRejected => write!(f, "target plate matches submitter's own plate"),
            ValidationError::InsufficientBalance => write!(f, "no credits left for this polarity"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A submission that passed all checks, with identity fields normalized
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTag {
    pub target: PlateRef,
    pub polarity: TagPolarity,
    pub reason: String,
    pub location: Option<GeoPoint>,
}

/// Validate a prospective tag against format and business rules.
///
/// Checks run in a fixed order: jurisdiction, plate length, reason,
/// self-tag, balance. The first failure wins. No side effects.
pub fn validate(submission: &TagSubmission, submitter: &User) -> Result<ValidatedTag, ValidationError> {
    let target = PlateRef::normalize(&submission.jurisdiction, &submission.plate);

    if !JURISDICTIONS.contains(&target.jurisdiction.as_str()) {
        return Err(ValidationError::InvalidJurisdiction);
    }

    if target.plate.len() < PLATE_MIN_LEN || target.plate.len() > PLATE_MAX_LEN {
        return Err(ValidationError::InvalidPlate);
    }

    let reason = submission.reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::MissingReason);
    }

    if let Some(own) = &submitter.plate {
        if *own == target {
            return Err(ValidationError::SelfTagRejected);
        }
    }

    if submitter.balances().for_polarity(submission.polarity) <= 0 {
        return Err(ValidationError::InsufficientBalance);
    }

    Ok(ValidatedTag {
        target,
        polarity: submission.polarity,
        reason: reason.to_string(),
        location: submission.location,
    })
}
