//! Submission pipeline: one tag from validation to badge awards
//!
//! A submission runs as a sequential chain of store calls in fixed order:
//!
//! ```text
//! TagSubmission
//!     ↓
//! validator::validate()            (no writes)
//!     ↓
//! store.create_tag_event()         (idempotency anchor)
//!     ↓
//! ledger: debit → given counters → resolve + credit target
//!     ↓
//! progression: experience award → set_experience_and_level
//!     ↓
//! badges: evaluate submitter (and resolved target) → record awards
//! ```
//!
//! There is no cross-write atomicity and no compensating transaction: a
//! failure after the tag persisted surfaces as a partial failure and
//! leaves earlier writes in place. Retrying with the same client tag id
//! short-circuits on the duplicate, so effects are never double-applied.

use super::badges::{self, CounterSnapshot};
use super::ledger;
use super::progression;
use super::store::{AwardOutcome, StoreError, TagStore};
use super::types::{SubmitOutcome, TagEvent, TagPolarity, TagSubmission, User};
use super::validator::{self, ValidationError};
use rand::RngCore;
use std::collections::HashSet;
use std::sync::Arc;

/// Submission failures surfaced to the caller
#[derive(Debug)]
pub enum SubmitError {
    /// Rejected before any write; never retried automatically
    Validation(ValidationError),
    /// Submitter id not present in the store
    UnknownSubmitter(String),
    /// The initial tag persist failed; nothing was written
    Store(StoreError),
    /// A write failed after the tag persisted; earlier writes stand
    Partial {
        step: &'static str,
        source: StoreError,
    },
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Validation(e) => write!(f, "validation failed: {}", e),
            SubmitError::UnknownSubmitter(id) => write!(f, "unknown submitter: {}", id),
            SubmitError::Store(e) => write!(f, "store error: {}", e),
            SubmitError::Partial { step, source } => {
                write!(f, "submission incomplete at step '{}': {}", step, source)
            }
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Validation(e) => Some(e),
            SubmitError::Store(e) | SubmitError::Partial { source: e, .. } => Some(e),
            SubmitError::UnknownSubmitter(_) => None,
        }
    }
}

impl From<ValidationError> for SubmitError {
    fn from(err: ValidationError) -> Self {
        SubmitError::Validation(err)
    }
}

/// Orchestrates tag submissions against a durable store
pub struct TagPipeline {
    store: Arc<dyn TagStore>,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl TagPipeline {
    /// Create a pipeline using system time for event timestamps
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self::new_with_timestamp_fn(store, Box::new(|| chrono::Utc::now().timestamp()))
    }

    /// Create a pipeline with a custom timestamp function (tests)
    pub fn new_with_timestamp_fn(
        store: Arc<dyn TagStore>,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self { store, now_fn }
    }

    /// Process one tag submission through the full chain.
    ///
    /// Returns the outcome the caller reports to the user: experience
    /// gained, whether a level was crossed, and any newly awarded badges.
    pub async fn submit(&self, submission: &TagSubmission) -> Result<SubmitOutcome, SubmitError> {
        // Retry probe first: a client id that is already recorded means an
        // earlier attempt got past the persist step, and re-validation
        // would read post-debit balances. Short-circuit before validating.
        if let Some(id) = &submission.client_tag_id {
            let exists = self
                .store
                .tag_event_exists(id)
                .await
                .map_err(SubmitError::Store)?;
            if exists {
                log::warn!("🔁 Tag {} already recorded, skipping re-apply", id);
                return Ok(SubmitOutcome {
                    tag_id: id.clone(),
                    exp_gained: 0,
                    leveled_up: false,
                    new_badges: Vec::new(),
                    duplicate: true,
                });
            }
        }

        let submitter = self
            .store
            .get_user(&submission.creator_id)
            .await
            .map_err(SubmitError::Store)?
            .ok_or_else(|| SubmitError::UnknownSubmitter(submission.creator_id.clone()))?;

        let validated = validator::validate(submission, &submitter)?;

        let tag_id = submission
            .client_tag_id
            .clone()
            .unwrap_or_else(generate_tag_id);

        let event = TagEvent {
            id: tag_id.clone(),
            target: validated.target.clone(),
            creator_id: submitter.id.clone(),
            polarity: validated.polarity,
            reason: validated.reason.clone(),
            created_at: (self.now_fn)(),
            location: validated.location,
        };

        // Persist the tag first: the id anchors retry idempotency. The
        // conflict path catches a concurrent retry that raced the probe.
        match self.store.create_tag_event(&event).await {
            Ok(()) => {}
            Err(StoreError::DuplicateTag(id)) => {
                log::warn!("🔁 Tag {} already recorded, skipping re-apply", id);
                return Ok(SubmitOutcome {
                    tag_id: id,
                    exp_gained: 0,
                    leveled_up: false,
                    new_badges: Vec::new(),
                    duplicate: true,
                });
            }
            Err(e) => return Err(SubmitError::Store(e)),
        }

        ledger::debit_submitter(self.store.as_ref(), &submitter.id, validated.polarity)
            .await
            .map_err(|source| SubmitError::Partial { step: "debit", source })?;

        ledger::record_given(self.store.as_ref(), &submitter.id, validated.polarity)
            .await
            .map_err(|source| SubmitError::Partial {
                step: "given-counters",
                source,
            })?;

        let target_user =
            ledger::credit_target(self.store.as_ref(), &validated.target, validated.polarity)
                .await
                .map_err(|source| SubmitError::Partial {
                    step: "credit-target",
                    source,
                })?;

        let award = progression::experience_award(
            validated.polarity,
            validated.location.is_some(),
            validated.reason.chars().count(),
        );
        let update = progression::apply_award(submitter.experience, award);

        self.store
            .set_experience_and_level(&submitter.id, update.experience, update.level)
            .await
            .map_err(|source| SubmitError::Partial {
                step: "progression",
                source,
            })?;

        let new_badges = self
            .award_new_badges(&submitter, validated.polarity, update.experience)
            .await?;

        // Received counters only move for the target, so its badges are
        // evaluated here too; they are not part of the submitter's outcome.
        if let Some(target) = &target_user {
            self.award_target_badges(target, validated.polarity).await?;
        }

        if update.leveled_up {
            log::info!(
                "🎉 User {} reached level {} ({} exp)",
                submitter.id,
                update.level,
                update.experience
            );
        }

        Ok(SubmitOutcome {
            tag_id,
            exp_gained: update.exp_gained,
            leveled_up: update.leveled_up,
            new_badges,
            duplicate: false,
        })
    }

    /// Evaluate and persist the submitter's newly earned badges
    async fn award_new_badges(
        &self,
        submitter: &User,
        polarity: TagPolarity,
        experience: i64,
    ) -> Result<Vec<String>, SubmitError> {
        // Counters as they stand after this submission's writes
        let mut counters = CounterSnapshot::from_user(submitter);
        counters.total_given += 1;
        match polarity {
            TagPolarity::Positive => counters.positive_given += 1,
            TagPolarity::Negative => {}
        }
        counters.experience = experience;

        let held: HashSet<String> = submitter.badges.iter().cloned().collect();
        let mut awarded = Vec::new();

        for def in badges::newly_satisfied(&counters, &held) {
            let outcome = self
                .store
                .record_badge_award(&submitter.id, def.id)
                .await
                .map_err(|source| SubmitError::Partial {
                    step: "badge-award",
                    source,
                })?;

            if outcome == AwardOutcome::Awarded {
                log::info!("🏅 Badge '{}' awarded to {}", def.id, submitter.id);
                awarded.push(def.id.to_string());
            }
        }

        Ok(awarded)
    }

    /// Evaluate the target's badges after its received counter moved
    async fn award_target_badges(
        &self,
        target: &User,
        polarity: TagPolarity,
    ) -> Result<(), SubmitError> {
        let mut counters = CounterSnapshot::from_user(target);
        match polarity {
            TagPolarity::Positive => counters.positive_received += 1,
            TagPolarity::Negative => counters.negative_received += 1,
        }

        let held: HashSet<String> = target.badges.iter().cloned().collect();

        for def in badges::newly_satisfied(&counters, &held) {
            let outcome = self
                .store
                .record_badge_award(&target.id, def.id)
                .await
                .map_err(|source| SubmitError::Partial {
                    step: "badge-award",
                    source,
                })?;

            if outcome == AwardOutcome::Awarded {
                log::info!("🏅 Badge '{}' awarded to {}", def.id, target.id);
            }
        }

        Ok(())
    }
}

/// Client-style tag id: 16 random bytes, hex encoded
fn generate_tag_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::test_support::create_test_store;
    use crate::engine::store::{EventFilter, SqliteTagStore};
    use crate::engine::types::{Balances, GeoPoint, PlateRef};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const BASE_TIME: i64 = 1700000000;

    fn make_pipeline(store: Arc<dyn TagStore>) -> TagPipeline {
        TagPipeline::new_with_timestamp_fn(store, Box::new(|| BASE_TIME))
    }

    async fn seed_user(
        store: &dyn TagStore,
        id: &str,
        plate: Option<(&str, &str)>,
        positive: i64,
        negative: i64,
    ) {
        store
            .create_user(&User::new(
                id,
                plate.map(|(j, p)| PlateRef::normalize(j, p)),
                Balances {
                    positive_credits: positive,
                    negative_credits: negative,
                },
                BASE_TIME,
            ))
            .await
            .unwrap();
    }

    fn make_submission(creator: &str, polarity: TagPolarity, reason: &str) -> TagSubmission {
        TagSubmission {
            creator_id: creator.to_string(),
            plate: "ABC123".to_string(),
            jurisdiction: "NY".to_string(),
            polarity,
            reason: reason.to_string(),
            location: None,
            client_tag_id: None,
        }
    }

    #[tokio::test]
    async fn test_basic_negative_tag() {
        // Scenario: one negative credit, 10-character reason, no coordinate
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 0, 1).await;
        seed_user(store.as_ref(), "target", Some(("NY", "ABC123")), 0, 0).await;

        let pipeline = make_pipeline(store.clone());
        let outcome = pipeline
            .submit(&make_submission("tagger", TagPolarity::Negative, "ten chars!"))
            .await
            .unwrap();

        assert_eq!(outcome.exp_gained, 25);
        assert!(!outcome.leveled_up);
        assert!(!outcome.duplicate);
        // First tag ever, so the catalog's first badge fires
        assert_eq!(outcome.new_badges, vec!["first_tag".to_string()]);

        let tagger = store.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.negative_credits, 0);
        assert_eq!(tagger.experience, 25);
        assert_eq!(tagger.total_given, 1);
        assert_eq!(tagger.negative_given, 1);

        let target = store.get_user("target").await.unwrap().unwrap();
        assert_eq!(target.negative_received, 1);
        assert_eq!(target.positive_received, 0);
    }

    #[tokio::test]
    async fn test_bonus_stacking() {
        // Scenario: coordinate plus 30-character reason on a positive tag
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 3, 0).await;

        let pipeline = make_pipeline(store.clone());
        let mut submission = make_submission(
            "tagger",
            TagPolarity::Positive,
            "let me merge onto the highway!", // 30 chars
        );
        submission.location = Some(GeoPoint {
            latitude: 40.7,
            longitude: -74.0,
        });

        let outcome = pipeline.submit(&submission).await.unwrap();

        // 30 base + 5 location + 10 detailed reason
        assert_eq!(outcome.exp_gained, 45);

        let tagger = store.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.positive_credits, 2);
        assert_eq!(tagger.experience, 45);
    }

    #[tokio::test]
    async fn test_level_up_detection() {
        // 90 exp + 25 award crosses the 100 threshold into level 2
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 0, 1).await;
        store
            .set_experience_and_level("tagger", 90, 1)
            .await
            .unwrap();

        let pipeline = make_pipeline(store.clone());
        let outcome = pipeline
            .submit(&make_submission("tagger", TagPolarity::Negative, "ten chars!"))
            .await
            .unwrap();

        assert_eq!(outcome.exp_gained, 25);
        assert!(outcome.leveled_up);

        let tagger = store.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.experience, 115);
        assert_eq!(tagger.level, 2);
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 0, 0).await;

        let pipeline = make_pipeline(store.clone());
        let result = pipeline
            .submit(&make_submission("tagger", TagPolarity::Negative, "no credits"))
            .await;

        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::InsufficientBalance))
        ));

        // Nothing persisted, nothing mutated
        assert!(store.list_tag_events(&EventFilter::all()).await.unwrap().is_empty());
        let tagger = store.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.total_given, 0);
    }

    #[tokio::test]
    async fn test_duplicate_submission_short_circuits() {
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 0, 5).await;

        let pipeline = make_pipeline(store.clone());
        let mut submission = make_submission("tagger", TagPolarity::Negative, "ten chars!");
        submission.client_tag_id = Some("client-id-1".to_string());

        let first = pipeline.submit(&submission).await.unwrap();
        assert!(!first.duplicate);
        assert_eq!(first.exp_gained, 25);

        // Retry with the same client id: zero-effect outcome
        let second = pipeline.submit(&submission).await.unwrap();
        assert!(second.duplicate);
        assert_eq!(second.exp_gained, 0);
        assert!(second.new_badges.is_empty());

        // Effects applied exactly once
        let tagger = store.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.negative_credits, 4);
        assert_eq!(tagger.experience, 25);
        assert_eq!(tagger.total_given, 1);
        assert_eq!(
            store.list_tag_events(&EventFilter::all()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_unresolved_target_skips_credit() {
        // Nobody registered plate NY ABC123: submission still succeeds
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 1, 0).await;

        let pipeline = make_pipeline(store.clone());
        let outcome = pipeline
            .submit(&make_submission("tagger", TagPolarity::Positive, "ten chars!"))
            .await
            .unwrap();

        assert_eq!(outcome.exp_gained, 30);
        assert_eq!(
            store.list_tag_events(&EventFilter::all()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_submitter() {
        let store = Arc::new(create_test_store());
        let pipeline = make_pipeline(store);

        let result = pipeline
            .submit(&make_submission("ghost", TagPolarity::Negative, "ten chars!"))
            .await;

        assert!(matches!(result, Err(SubmitError::UnknownSubmitter(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_balanced_badge_awarded_to_target() {
        // Target sits at 5 positive / 5 negative received; one more
        // positive tag makes 6/5 (difference 1, within closeness 2).
        let store = Arc::new(create_test_store());
        seed_user(store.as_ref(), "tagger", None, 1, 0).await;
        seed_user(store.as_ref(), "target", Some(("NY", "ABC123")), 0, 0).await;
        for _ in 0..5 {
            store
                .increment_received("target", TagPolarity::Positive)
                .await
                .unwrap();
            store
                .increment_received("target", TagPolarity::Negative)
                .await
                .unwrap();
        }

        let pipeline = make_pipeline(store.clone());
        pipeline
            .submit(&make_submission("tagger", TagPolarity::Positive, "ten chars!"))
            .await
            .unwrap();

        let target = store.get_user("target").await.unwrap().unwrap();
        assert_eq!(target.positive_received, 6);
        assert!(target.badges.contains(&"balanced_karma".to_string()));
    }

    /// Store double that fails the received-counter write once, to pin
    /// down partial-failure semantics.
    struct FlakyStore {
        inner: SqliteTagStore,
        fail_credit: AtomicBool,
    }

    #[async_trait]
    impl TagStore for FlakyStore {
        async fn create_tag_event(&self, event: &TagEvent) -> Result<(), StoreError> {
            self.inner.create_tag_event(event).await
        }

        async fn tag_event_exists(&self, tag_id: &str) -> Result<bool, StoreError> {
            self.inner.tag_event_exists(tag_id).await
        }

        async fn adjust_balance(
            &self,
            user_id: &str,
            polarity: TagPolarity,
            delta: i64,
        ) -> Result<Balances, StoreError> {
            self.inner.adjust_balance(user_id, polarity, delta).await
        }

        async fn increment_given(&self, user_id: &str, polarity: TagPolarity) -> Result<(), StoreError> {
            self.inner.increment_given(user_id, polarity).await
        }

        async fn increment_received(
            &self,
            user_id: &str,
            polarity: TagPolarity,
        ) -> Result<(), StoreError> {
            if self.fail_credit.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Database(rusqlite::Error::InvalidQuery));
            }
            self.inner.increment_received(user_id, polarity).await
        }

        async fn set_experience_and_level(
            &self,
            user_id: &str,
            experience: i64,
            level: i32,
        ) -> Result<(), StoreError> {
            self.inner
                .set_experience_and_level(user_id, experience, level)
                .await
        }

        async fn record_badge_award(
            &self,
            user_id: &str,
            badge_id: &str,
        ) -> Result<AwardOutcome, StoreError> {
            self.inner.record_badge_award(user_id, badge_id).await
        }

        async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
            self.inner.get_user(user_id).await
        }

        async fn find_user_by_plate(&self, plate: &PlateRef) -> Result<Option<User>, StoreError> {
            self.inner.find_user_by_plate(plate).await
        }

        async fn create_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.create_user(user).await
        }

        async fn list_tag_events(&self, filter: &EventFilter) -> Result<Vec<TagEvent>, StoreError> {
            self.inner.list_tag_events(filter).await
        }

        async fn list_users(&self) -> Result<Vec<User>, StoreError> {
            self.inner.list_users().await
        }
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_earlier_writes() {
        let store = Arc::new(FlakyStore {
            inner: create_test_store(),
            fail_credit: AtomicBool::new(true),
        });
        seed_user(&store.inner, "tagger", None, 0, 1).await;
        seed_user(&store.inner, "target", Some(("NY", "ABC123")), 0, 0).await;

        let pipeline = make_pipeline(store.clone());
        let mut submission = make_submission("tagger", TagPolarity::Negative, "ten chars!");
        submission.client_tag_id = Some("retry-me".to_string());

        let result = pipeline.submit(&submission).await;
        assert!(matches!(
            result,
            Err(SubmitError::Partial {
                step: "credit-target",
                ..
            })
        ));

        // Tag persisted and debit applied; no rollback happened
        assert_eq!(
            store.inner.list_tag_events(&EventFilter::all()).await.unwrap().len(),
            1
        );
        let tagger = store.inner.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.negative_credits, 0);
        // Progression never ran
        assert_eq!(tagger.experience, 0);

        // Retry short-circuits on the duplicate id instead of re-debiting
        let retry = pipeline.submit(&submission).await.unwrap();
        assert!(retry.duplicate);
        let tagger = store.inner.get_user("tagger").await.unwrap().unwrap();
        assert_eq!(tagger.negative_credits, 0);
    }
}
