// src/handlers/review.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        progress::AssignmentResponse,
        review::{EvaluateReviewRequest, SubmitReviewRequest},
    },
    services::{assignment, feedback, gating, quorum},
    state::AppState,
    utils::jwt::Claims,
};

/// Returns the caller's review assignment for a challenge, opening one if
/// an eligible submission exists.
///
/// The caller must have submitted their own elaboration on an enabled
/// challenge and must still owe reviews, unless an open assignment exists.
pub async fn open_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(challenge_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = state.store.as_ref();
    let config = &state.config.review;

    let (challenge, chain) = gating::load_challenge(store, challenge_id).await?;

    if !gating::is_enabled_for_user(store, config, &chain, &challenge, user_id).await? {
        return Err(AppError::AccessDenied("Challenge is not enabled".to_string()));
    }

    let own = store.elaboration_latest(challenge.id, user_id).await?;
    if !own.is_some_and(|e| e.is_submitted()) {
        return Err(AppError::AccessDenied(
            "Submit your own elaboration before reviewing".to_string(),
        ));
    }

    // An assignment already handed out can always be fetched again.
    let has_open = store.review_find_open(challenge.id, user_id).await?.is_some();
    if !has_open && quorum::has_enough_reviews(store, config, challenge.id, user_id).await? {
        return Err(AppError::AccessDenied(
            "You have already written enough reviews".to_string(),
        ));
    }

    let review = assignment::get_or_open_review(
        store,
        state.offsets.as_ref(),
        config,
        challenge.id,
        user_id,
        Utc::now(),
    )
    .await?;

    let elaboration_text = match &review {
        Some(r) => store.elaboration_get(r.elaboration_id).await?.map(|e| e.text),
        None => None,
    };

    Ok(Json(AssignmentResponse {
        review,
        elaboration_text,
        questions: store.review_questions_for(challenge.id).await?,
        stack_id: challenge.stack_id,
    }))
}

/// Closes the caller's open review.
pub async fn submit_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(review_id): Path<i64>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let review = assignment::record_review_submission(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &state.config.review,
        review_id,
        user_id,
        payload.appraisal,
        &payload.answers,
        Utc::now(),
    )
    .await?;

    Ok(Json(review))
}

/// Lists submitted reviews of the caller's elaboration.
pub async fn received_reviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(challenge_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let received = feedback::received_reviews(state.store.as_ref(), challenge_id, user_id).await?;
    Ok(Json(received))
}

pub async fn evaluate_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(review_id): Path<i64>,
    Json(payload): Json<EvaluateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let evaluation =
        feedback::evaluate_review(state.store.as_ref(), review_id, user_id, payload.rating).await?;
    Ok(Json(evaluation))
}
