// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        challenge::{CreateChallengeRequest, CreateReviewQuestionRequest},
        stack::CreateStackRequest,
    },
    services::chain::ChainIndex,
    state::AppState,
    store::NewChallenge,
    utils::html::clean_html,
};

/// Creates a new, empty stack.
/// Admin only.
pub async fn create_stack(
    State(state): State<AppState>,
    Json(payload): Json<CreateStackRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let stack = state
        .store
        .stack_insert(&payload.title, &clean_html(&payload.description))
        .await?;
    tracing::info!(stack_id = stack.id, "Stack created");

    Ok((StatusCode::CREATED, Json(stack)))
}

/// Appends a challenge to a stack's chain.
/// The prerequisite must be the stack's current final challenge, or absent
/// for the first challenge of an empty stack.
/// Admin only.
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(payload): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let store = state.store.as_ref();

    store
        .stack_get(payload.stack_id)
        .await?
        .ok_or(AppError::NotFound("Stack not found".to_string()))?;

    let chain = ChainIndex::load(store, payload.stack_id).await?;
    chain.check_append(payload.prerequisite_id)?;

    let challenge = store
        .challenge_insert(&NewChallenge {
            stack_id: payload.stack_id,
            title: payload.title,
            description: clean_html(&payload.description),
            prerequisite_id: payload.prerequisite_id,
        })
        .await?;
    tracing::info!(
        challenge_id = challenge.id,
        stack_id = challenge.stack_id,
        prerequisite_id = ?challenge.prerequisite_id,
        "Challenge created"
    );

    Ok((StatusCode::CREATED, Json(challenge)))
}

/// Attaches a review question to a challenge.
/// Admin only.
pub async fn create_review_question(
    State(state): State<AppState>,
    Path(challenge_id): Path<i64>,
    Json(payload): Json<CreateReviewQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    state
        .store
        .challenge_get(challenge_id)
        .await?
        .ok_or(AppError::NotFound("Challenge not found".to_string()))?;

    let question = state
        .store
        .review_question_insert(challenge_id, payload.position, &payload.text)
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}
