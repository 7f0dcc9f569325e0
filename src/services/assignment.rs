// src/services/assignment.rs

//! Peer-review assignment and submission.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    config::ReviewConfig,
    error::{AppError, AppResult},
    models::review::{AnswerInput, Appraisal, Review},
    notify::{Notifier, dispatch_review_notification},
    services::{gating, offset::OffsetSource},
    store::Store,
    utils::html::clean_html,
};

/// Returns the reviewer's open assignment for the challenge, or opens one.
///
/// A new assignment targets the oldest eligible submission that has been
/// idle for at least a randomly drawn number of hours. `Ok(None)` means no
/// submission qualifies yet and the caller should try again later.
///
/// Callers check beforehand that the challenge is enabled for the reviewer,
/// that the reviewer's own work is submitted and that quorum is not met.
pub async fn get_or_open_review(
    store: &dyn Store,
    offsets: &dyn OffsetSource,
    config: &ReviewConfig,
    challenge_id: i64,
    reviewer_id: i64,
    now: DateTime<Utc>,
) -> AppResult<Option<Review>> {
    if let Some(open) = store.review_find_open(challenge_id, reviewer_id).await? {
        return Ok(Some(open));
    }

    let hours = offsets.draw_hours(config.min_offset_hours, config.max_offset_hours);
    let cutoff = submission_cutoff(now, hours)?;

    let candidates = store
        .review_candidates(challenge_id, reviewer_id, cutoff)
        .await?;

    let Some(candidate) = candidates.into_iter().find(|e| e.user_id != reviewer_id) else {
        tracing::debug!(challenge_id, reviewer_id, offset_hours = hours, "No review candidate yet");
        return Ok(None);
    };

    let review = store.review_open_or_create(&candidate, reviewer_id).await?;
    tracing::info!(
        review_id = review.id,
        elaboration_id = review.elaboration_id,
        challenge_id,
        reviewer_id,
        offset_hours = hours,
        "Review assignment ready"
    );

    Ok(Some(review))
}

/// Latest submission time still eligible when `hours` of idleness are required.
fn submission_cutoff(now: DateTime<Utc>, hours: i64) -> AppResult<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|offset| now.checked_sub_signed(offset))
        .ok_or_else(|| {
            AppError::Configuration(format!("review offset of {} hours is out of range", hours))
        })
}

/// Closes the caller's open review with a verdict and answers, then
/// notifies the author of the reviewed work.
#[allow(clippy::too_many_arguments)]
pub async fn record_review_submission(
    store: &dyn Store,
    notifier: &dyn Notifier,
    config: &ReviewConfig,
    review_id: i64,
    reviewer_id: i64,
    appraisal: Appraisal,
    answers: &[AnswerInput],
    now: DateTime<Utc>,
) -> AppResult<Review> {
    let review = store
        .review_get(review_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    if review.reviewer_id != reviewer_id {
        return Err(AppError::AccessDenied("Review belongs to another reviewer".to_string()));
    }

    let open = store.review_find_open(review.challenge_id, reviewer_id).await?;
    if open.map(|r| r.id) != Some(review.id) {
        return Err(AppError::AccessDenied("Review is not open".to_string()));
    }

    if !gating::is_enabled(store, config, review.challenge_id, reviewer_id).await? {
        return Err(AppError::AccessDenied("Challenge is not enabled".to_string()));
    }

    let known: HashSet<i64> = store
        .review_questions_for(review.challenge_id)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect();
    let mut cleaned = Vec::with_capacity(answers.len());
    for answer in answers {
        if !known.contains(&answer.question_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} does not belong to this challenge",
                answer.question_id
            )));
        }
        cleaned.push((answer.question_id, clean_html(&answer.answer)));
    }

    let submitted = store.review_submit(review.id, appraisal, &cleaned, now).await?;
    tracing::info!(
        review_id = submitted.id,
        reviewer_id,
        appraisal = %submitted.appraisal,
        "Review submitted"
    );

    dispatch_review_notification(notifier, &submitted).await;

    Ok(submitted)
}
