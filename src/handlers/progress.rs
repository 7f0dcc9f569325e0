// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::progress::StackOverview,
    services::{chain::ChainIndex, gating},
    state::AppState,
    utils::jwt::Claims,
};

/// Lists a stack's challenges in chain order with the caller's status and
/// enablement for each.
pub async fn get_stack_overview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(stack_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = state.store.as_ref();

    let stack = store
        .stack_get(stack_id)
        .await?
        .ok_or(AppError::NotFound("Stack not found".to_string()))?;

    let chain = ChainIndex::load(store, stack.id).await?;

    let mut challenges = Vec::with_capacity(chain.len());
    for challenge in chain.ordered() {
        challenges.push(
            gating::challenge_progress(store, &state.config.review, &chain, challenge, user_id)
                .await?,
        );
    }

    Ok(Json(StackOverview { stack, challenges }))
}

/// Retrieves one challenge with the caller's status and enablement.
pub async fn get_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(challenge_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = state.store.as_ref();

    let (challenge, chain) = gating::load_challenge(store, challenge_id).await?;
    let progress =
        gating::challenge_progress(store, &state.config.review, &chain, &challenge, user_id)
            .await?;

    Ok(Json(progress))
}
