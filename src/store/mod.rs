// src/store/mod.rs

//! Persistence boundary for the progression engine.
//!
//! The engine only ever talks to [`Store`]. `PgStore` backs the running
//! service, `MemoryStore` backs tests and local experiments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        challenge::{Challenge, ReviewQuestion},
        elaboration::Elaboration,
        review::{Appraisal, Review, ReviewAnswer, ReviewEvaluation, ReviewRating},
        stack::Stack,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Fields needed to insert a challenge.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub stack_id: i64,
    pub title: String,
    pub description: String,
    pub prerequisite_id: Option<i64>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Stacks and challenges
    // ------------------------------------------------------------------

    async fn stack_get(&self, id: i64) -> AppResult<Option<Stack>>;

    async fn stack_insert(&self, title: &str, description: &str) -> AppResult<Stack>;

    async fn challenge_get(&self, id: i64) -> AppResult<Option<Challenge>>;

    /// All challenges of a stack, in no particular order.
    async fn challenge_list_by_stack(&self, stack_id: i64) -> AppResult<Vec<Challenge>>;

    /// Inserts a challenge. A second dependent of the same prerequisite is a
    /// `Conflict`.
    async fn challenge_insert(&self, new: &NewChallenge) -> AppResult<Challenge>;

    /// Review questions of a challenge in ascending position.
    async fn review_questions_for(&self, challenge_id: i64) -> AppResult<Vec<ReviewQuestion>>;

    async fn review_question_insert(
        &self,
        challenge_id: i64,
        position: i32,
        text: &str,
    ) -> AppResult<ReviewQuestion>;

    // ------------------------------------------------------------------
    // Elaborations
    // ------------------------------------------------------------------

    async fn elaboration_get(&self, id: i64) -> AppResult<Option<Elaboration>>;

    /// The most recently created elaboration of `user_id` for `challenge_id`.
    async fn elaboration_latest(
        &self,
        challenge_id: i64,
        user_id: i64,
    ) -> AppResult<Option<Elaboration>>;

    /// Creates or overwrites the user's draft. `Conflict` once submitted.
    async fn elaboration_save_draft(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
    ) -> AppResult<Elaboration>;

    /// Creates or finalizes the user's elaboration with `submitted_at = at`.
    /// `Conflict` if it was already submitted.
    async fn elaboration_submit(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Elaboration>;

    /// Submitted elaborations of `challenge_id` that `reviewer_id` may review:
    /// not their own, not reviewed by them before, submitted no later than
    /// `submitted_before`. Oldest submission first, ties by id.
    async fn review_candidates(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
        submitted_before: DateTime<Utc>,
    ) -> AppResult<Vec<Elaboration>>;

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    async fn review_get(&self, id: i64) -> AppResult<Option<Review>>;

    /// Every review row (open or submitted) `reviewer_id` holds for
    /// elaborations of `challenge_id`.
    async fn reviews_authored(&self, challenge_id: i64, reviewer_id: i64)
    -> AppResult<Vec<Review>>;

    /// Every review row (open or submitted) against one elaboration.
    async fn reviews_of_elaboration(&self, elaboration_id: i64) -> AppResult<Vec<Review>>;

    /// The reviewer's open assignment for `challenge_id`, if any.
    async fn review_find_open(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
    ) -> AppResult<Option<Review>>;

    /// Atomically returns the reviewer's open assignment for the
    /// elaboration's challenge, or opens one against `elaboration`.
    /// Never leaves two open reviews for one (reviewer, challenge).
    async fn review_open_or_create(
        &self,
        elaboration: &Elaboration,
        reviewer_id: i64,
    ) -> AppResult<Review>;

    /// Stores the answers and closes the review in one transaction.
    /// `Conflict` if the review was already submitted.
    async fn review_submit(
        &self,
        review_id: i64,
        appraisal: Appraisal,
        answers: &[(i64, String)],
        at: DateTime<Utc>,
    ) -> AppResult<Review>;

    async fn review_answers(&self, review_id: i64) -> AppResult<Vec<ReviewAnswer>>;

    /// Inserts or overwrites `user_id`'s rating of a review.
    async fn review_evaluation_upsert(
        &self,
        review_id: i64,
        user_id: i64,
        rating: ReviewRating,
    ) -> AppResult<ReviewEvaluation>;
}
