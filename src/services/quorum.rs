// src/services/quorum.rs

use crate::{
    config::ReviewConfig,
    error::AppResult,
    models::review::{Appraisal, Review},
    store::Store,
};

/// True when any review carries a FAIL verdict.
fn contains_fail(reviews: &[Review]) -> bool {
    reviews.iter().any(|r| r.appraisal == Appraisal::Fail)
}

/// Counts submitted reviews, optionally leaving out FAIL verdicts.
fn count_received(reviews: &[Review], require_non_fail: bool) -> usize {
    reviews
        .iter()
        .filter(|r| !r.is_open())
        .filter(|r| !require_non_fail || r.appraisal != Appraisal::Fail)
        .count()
}

/// Reviews `user_id` holds for elaborations of `challenge_id`.
/// Open assignments count as well as submitted ones, whatever the verdict.
pub async fn reviews_authored_for(
    store: &dyn Store,
    challenge_id: i64,
    user_id: i64,
) -> AppResult<Vec<Review>> {
    store.reviews_authored(challenge_id, user_id).await
}

/// True once the user has authored at least `config.quorum` reviews.
pub async fn has_enough_reviews(
    store: &dyn Store,
    config: &ReviewConfig,
    challenge_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    let authored = reviews_authored_for(store, challenge_id, user_id).await?;
    Ok(authored.len() >= config.quorum)
}

/// True when the user's own elaboration for the challenge received a FAIL.
pub async fn has_blocking_review(
    store: &dyn Store,
    challenge_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    let Some(elaboration) = store.elaboration_latest(challenge_id, user_id).await? else {
        return Ok(false);
    };
    let received = store.reviews_of_elaboration(elaboration.id).await?;
    Ok(contains_fail(&received))
}

/// Submitted reviews the user's own elaboration for the challenge received.
pub async fn received_review_count(
    store: &dyn Store,
    challenge_id: i64,
    user_id: i64,
    require_non_fail: bool,
) -> AppResult<usize> {
    let Some(elaboration) = store.elaboration_latest(challenge_id, user_id).await? else {
        return Ok(0);
    };
    let received = store.reviews_of_elaboration(elaboration.id).await?;
    Ok(count_received(&received, require_non_fail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(id: i64, appraisal: Appraisal, submitted: bool) -> Review {
        Review {
            id,
            elaboration_id: 1,
            challenge_id: 1,
            reviewer_id: id + 100,
            appraisal,
            created_at: Utc::now(),
            submitted_at: submitted.then(Utc::now),
        }
    }

    #[test]
    fn test_contains_fail() {
        assert!(!contains_fail(&[]));
        assert!(!contains_fail(&[review(1, Appraisal::Success, true)]));
        assert!(contains_fail(&[
            review(1, Appraisal::Success, true),
            review(2, Appraisal::Fail, true),
        ]));
    }

    #[test]
    fn test_count_received_skips_open_reviews() {
        let reviews = [
            review(1, Appraisal::Success, true),
            review(2, Appraisal::Pending, false),
            review(3, Appraisal::Fail, true),
        ];
        assert_eq!(count_received(&reviews, false), 2);
        assert_eq!(count_received(&reviews, true), 1);
    }
}
