//! Tag Event Processing & Progression Engine
//!
//! One accepted tag submission fans out into a fixed chain of writes:
//!
//! ```text
//! TagSubmission
//!     ↓
//! Validator (format + business rules, no writes)
//!     ↓
//! persist TagEvent (idempotency anchor)
//!     ↓
//! Economy Ledger (debit submitter, credit resolved target)
//!     ↓
//! Progression Calculator (experience award, level curve)
//!     ↓
//! Badge Rule Engine (catalog-order threshold rules, idempotent awards)
//! ```
//!
//! The engine owns no shared mutable state: every counter mutation is an
//! atomic operation behind the [`store::TagStore`] trait, and failures
//! after the first write surface as partial failures without rollback.
//! Retrying the same client tag id short-circuits on the duplicate.
//!
//! ## Module organization
//!
//! - `types` - Core data structures (TagEvent, User, TagSubmission)
//! - `validator` - Pre-write format and business checks
//! - `ledger` - Credit debit and received-rating counters
//! - `progression` - Experience awards and level curve
//! - `badges` - Badge catalog and rule evaluation
//! - `store` - Durable store trait and SQLite implementation
//! - `pipeline` - Submission orchestration
//! - `ingestion` - mpsc submission channel processor

pub mod badges;
pub mod ingestion;
pub mod ledger;
pub mod pipeline;
pub mod progression;
pub mod store;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use badges::{BadgeCriterion, BadgeDef, CounterKind, CounterSnapshot, CATALOG};
pub use ingestion::{start_submission_ingestion, SubmissionRequest};
pub use pipeline::{SubmitError, TagPipeline};
pub use progression::{apply_award, experience_award, level_for_experience, LEVEL_THRESHOLDS};
pub use store::{AwardOutcome, EventFilter, SqliteTagStore, StoreError, TagStore};
pub use types::{
    Balances, GeoPoint, PlateRef, SubmitOutcome, TagEvent, TagPolarity, TagSubmission, User,
};
pub use validator::{validate, ValidationError};
