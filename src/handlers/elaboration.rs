// src/handlers/elaboration.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::elaboration::SaveElaborationRequest,
    services::elaboration,
    state::AppState,
    utils::jwt::Claims,
};

/// Returns the caller's elaboration for a challenge.
pub async fn get_my_elaboration(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(challenge_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let elaboration = state
        .store
        .elaboration_latest(challenge_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Elaboration not found".to_string()))?;

    Ok(Json(elaboration))
}

/// Saves a draft. Rejected once the elaboration has been submitted.
pub async fn save_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(challenge_id): Path<i64>,
    Json(payload): Json<SaveElaborationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let saved = elaboration::save_draft(
        state.store.as_ref(),
        &state.config.review,
        challenge_id,
        user_id,
        &payload.text,
    )
    .await?;

    Ok(Json(saved))
}

/// Submits the caller's elaboration.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(challenge_id): Path<i64>,
    Json(payload): Json<SaveElaborationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let submitted = elaboration::submit(
        state.store.as_ref(),
        &state.config.review,
        challenge_id,
        user_id,
        &payload.text,
        Utc::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(submitted)))
}
