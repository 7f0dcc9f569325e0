// src/services/elaboration.rs

use chrono::{DateTime, Utc};

use crate::{
    config::ReviewConfig,
    error::{AppError, AppResult},
    models::elaboration::Elaboration,
    services::gating,
    store::Store,
    utils::html::clean_html,
};

/// Saves the user's draft.
///
/// Allowed when the challenge is enabled for the user. The final challenge
/// of a stack accepts drafts before it opens, so learners can start on it
/// early.
pub async fn save_draft(
    store: &dyn Store,
    config: &ReviewConfig,
    challenge_id: i64,
    user_id: i64,
    text: &str,
) -> AppResult<Elaboration> {
    let (challenge, chain) = gating::load_challenge(store, challenge_id).await?;

    let enabled = gating::is_enabled_for_user(store, config, &chain, &challenge, user_id).await?;
    if !enabled && !chain.is_final(&challenge) {
        return Err(AppError::AccessDenied("Challenge is not enabled".to_string()));
    }

    store
        .elaboration_save_draft(challenge.id, user_id, &clean_html(text))
        .await
}

/// Submits the user's elaboration. Requires an enabled challenge and a
/// non-empty body.
pub async fn submit(
    store: &dyn Store,
    config: &ReviewConfig,
    challenge_id: i64,
    user_id: i64,
    text: &str,
    now: DateTime<Utc>,
) -> AppResult<Elaboration> {
    let (challenge, chain) = gating::load_challenge(store, challenge_id).await?;

    if !gating::is_enabled_for_user(store, config, &chain, &challenge, user_id).await? {
        return Err(AppError::AccessDenied("Challenge is not enabled".to_string()));
    }

    let text = clean_html(text);
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Elaboration is empty".to_string()));
    }

    let elaboration = store
        .elaboration_submit(challenge.id, user_id, &text, now)
        .await?;
    tracing::info!(
        elaboration_id = elaboration.id,
        challenge_id = challenge.id,
        user_id,
        "Elaboration submitted"
    );

    Ok(elaboration)
}
