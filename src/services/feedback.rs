// src/services/feedback.rs

//! What learners see of the reviews their own work received.

use crate::{
    error::{AppError, AppResult},
    models::review::{ReceivedReview, ReviewEvaluation, ReviewRating},
    store::Store,
};

/// Submitted reviews of the user's elaboration for a challenge, with answers.
pub async fn received_reviews(
    store: &dyn Store,
    challenge_id: i64,
    user_id: i64,
) -> AppResult<Vec<ReceivedReview>> {
    let Some(elaboration) = store.elaboration_latest(challenge_id, user_id).await? else {
        return Ok(Vec::new());
    };

    let mut received = Vec::new();
    for review in store.reviews_of_elaboration(elaboration.id).await? {
        if review.is_open() {
            continue;
        }
        let answers = store.review_answers(review.id).await?;
        received.push(ReceivedReview {
            id: review.id,
            appraisal: review.appraisal,
            submitted_at: review.submitted_at,
            answers,
        });
    }

    Ok(received)
}

/// Records how the author rates a submitted review of their own work.
pub async fn evaluate_review(
    store: &dyn Store,
    review_id: i64,
    user_id: i64,
    rating: ReviewRating,
) -> AppResult<ReviewEvaluation> {
    let review = store
        .review_get(review_id)
        .await?
        .filter(|r| !r.is_open())
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    let elaboration = store
        .elaboration_get(review.elaboration_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Elaboration not found".to_string()))?;

    if elaboration.user_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the author of the reviewed work can rate this review".to_string(),
        ));
    }

    store.review_evaluation_upsert(review.id, user_id, rating).await
}
