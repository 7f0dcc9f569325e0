// src/services/gating.rs

//! Status codes and challenge enablement.
//!
//! Nothing here is cached: every answer is recomputed from the current
//! elaboration and review rows, since reviews arrive continuously.

use crate::{
    config::ReviewConfig,
    error::{AppError, AppResult},
    models::{
        challenge::Challenge,
        progress::{ChallengeProgress, ChallengeStatus},
    },
    services::{chain::ChainIndex, quorum},
    store::Store,
};

/// Loads a challenge together with its validated stack chain.
pub async fn load_challenge(store: &dyn Store, challenge_id: i64) -> AppResult<(Challenge, ChainIndex)> {
    let challenge = store
        .challenge_get(challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
    let chain = ChainIndex::load(store, challenge.stack_id).await?;
    Ok((challenge, chain))
}

/// Status of `user_id` on `challenge_id`.
///
/// Checks run in a fixed order (existence, submission, blocking, quorum):
/// a blocked user is never reported done, a user without a submission is
/// never reported blocked.
pub async fn status(
    store: &dyn Store,
    config: &ReviewConfig,
    challenge_id: i64,
    user_id: i64,
) -> AppResult<ChallengeStatus> {
    let Some(elaboration) = store.elaboration_latest(challenge_id, user_id).await? else {
        return Ok(ChallengeStatus::NotStarted);
    };
    if !elaboration.is_submitted() {
        return Ok(ChallengeStatus::Draft);
    }
    if quorum::has_blocking_review(store, challenge_id, user_id).await? {
        return Ok(ChallengeStatus::Blocked);
    }
    if quorum::has_enough_reviews(store, config, challenge_id, user_id).await? {
        return Ok(ChallengeStatus::Done);
    }
    Ok(ChallengeStatus::Submitted)
}

async fn submitted_by_user(store: &dyn Store, challenge_id: i64, user_id: i64) -> AppResult<bool> {
    Ok(store
        .elaboration_latest(challenge_id, user_id)
        .await?
        .is_some_and(|e| e.is_submitted()))
}

/// Whether `user_id` may work on `challenge`.
pub async fn is_enabled_for_user(
    store: &dyn Store,
    config: &ReviewConfig,
    chain: &ChainIndex,
    challenge: &Challenge,
    user_id: i64,
) -> AppResult<bool> {
    // Work already handed in stays reachable.
    if submitted_by_user(store, challenge.id, user_id).await? {
        return Ok(true);
    }

    let Some(prerequisite) = challenge.prerequisite_id else {
        return Ok(true);
    };

    if !submitted_by_user(store, prerequisite, user_id).await? {
        return Ok(false);
    }
    if quorum::has_blocking_review(store, prerequisite, user_id).await? {
        return Ok(false);
    }
    if !quorum::has_enough_reviews(store, config, prerequisite, user_id).await? {
        return Ok(false);
    }

    // The last hop of a stack also needs the learner's own work to have
    // been reviewed by peers, not only the learner's reviews of others.
    if chain.is_final(challenge) {
        let received = quorum::received_review_count(store, prerequisite, user_id, false).await?;
        if received < config.final_gate_received {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Loads the challenge and answers [`is_enabled_for_user`].
pub async fn is_enabled(
    store: &dyn Store,
    config: &ReviewConfig,
    challenge_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    let (challenge, chain) = load_challenge(store, challenge_id).await?;
    is_enabled_for_user(store, config, &chain, &challenge, user_id).await
}

/// Everything a client needs to render one challenge for `user_id`.
pub async fn challenge_progress(
    store: &dyn Store,
    config: &ReviewConfig,
    chain: &ChainIndex,
    challenge: &Challenge,
    user_id: i64,
) -> AppResult<ChallengeProgress> {
    let status = status(store, config, challenge.id, user_id).await?;
    let enabled = is_enabled_for_user(store, config, chain, challenge, user_id).await?;
    let final_id = chain.final_of(challenge)?.id;

    Ok(ChallengeProgress {
        challenge: challenge.clone(),
        status,
        status_label: status.label(),
        enabled,
        is_first: chain.is_first(challenge),
        is_final: chain.is_final(challenge),
        next_id: chain.next(challenge).map(|c| c.id),
        final_id,
    })
}
