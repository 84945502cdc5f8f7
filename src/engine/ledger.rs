//! Economy ledger: the counter mutations implied by an accepted tag
//!
//! Each operation is a single atomic store call. The debit is guarded at
//! the storage layer, so even a submission that raced past the validator
//! cannot drive a balance negative.

use super::store::{StoreError, TagStore};
use super::types::{Balances, PlateRef, TagPolarity, User};

/// Debit exactly one credit of the tag's polarity from the submitter
pub async fn debit_submitter(
    store: &dyn TagStore,
    user_id: &str,
    polarity: TagPolarity,
) -> Result<Balances, StoreError> {
    let balances = store.adjust_balance(user_id, polarity, -1).await?;
    log::debug!(
        "💳 Debited 1 {} credit from {} (remaining: {})",
        polarity.as_str(),
        user_id,
        balances.for_polarity(polarity)
    );
    Ok(balances)
}

/// Record the submitter's given-tag counters
pub async fn record_given(
    store: &dyn TagStore,
    user_id: &str,
    polarity: TagPolarity,
) -> Result<(), StoreError> {
    store.increment_given(user_id, polarity).await
}

/// Credit the target's received counter when the plate resolves to a
/// registered user.
///
/// An unresolved plate is a valid terminal state: the credit is skipped
/// without error and `None` is returned.
pub async fn credit_target(
    store: &dyn TagStore,
    target: &PlateRef,
    polarity: TagPolarity,
) -> Result<Option<User>, StoreError> {
    let Some(target_user) = store.find_user_by_plate(target).await? else {
        log::debug!("🔍 No registered user for plate {}, credit skipped", target);
        return Ok(None);
    };

    store.increment_received(&target_user.id, polarity).await?;
    Ok(Some(target_user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::test_support::create_test_store;

    #[tokio::test]
    async fn test_debit_reduces_single_polarity() {
        let store = create_test_store();
        store
            .create_user(&User::new(
                "user_1",
                None,
                Balances {
                    positive_credits: 2,
                    negative_credits: 2,
                },
                1700000000,
            ))
            .await
            .unwrap();

        let balances = debit_submitter(&store, "user_1", TagPolarity::Positive)
            .await
            .unwrap();

        assert_eq!(balances.positive_credits, 1);
        assert_eq!(balances.negative_credits, 2);
    }

    #[tokio::test]
    async fn test_credit_skipped_for_unknown_plate() {
        let store = create_test_store();

        let credited = credit_target(
            &store,
            &PlateRef::normalize("NY", "GHOST1"),
            TagPolarity::Negative,
        )
        .await
        .unwrap();

        assert!(credited.is_none());
    }

    #[tokio::test]
    async fn test_credit_increments_target_counter() {
        let store = create_test_store();
        store
            .create_user(&User::new(
                "target_1",
                Some(PlateRef::normalize("NY", "ABC123")),
                Balances {
                    positive_credits: 0,
                    negative_credits: 0,
                },
                1700000000,
            ))
            .await
            .unwrap();

        let credited = credit_target(
            &store,
            &PlateRef::normalize("ny", "abc-123"),
            TagPolarity::Negative,
        )
        .await
        .unwrap();
        assert_eq!(credited.unwrap().id, "target_1");

        let target = store.get_user("target_1").await.unwrap().unwrap();
        assert_eq!(target.negative_received, 1);
        assert_eq!(target.positive_received, 0);
    }
}
