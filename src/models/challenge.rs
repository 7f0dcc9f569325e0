// src/models/challenge.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'challenges' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
    pub id: i64,
    pub stack_id: i64,
    pub title: String,
    pub description: String,

    /// The challenge that must be completed first.
    /// `None` marks the head of the stack's chain.
    pub prerequisite_id: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Challenge {
    pub fn is_first(&self) -> bool {
        self.prerequisite_id.is_none()
    }
}

/// DTO for creating a new challenge.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    pub stack_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    pub prerequisite_id: Option<i64>,
}

/// Represents the 'review_questions' table.
/// Prompts a reviewer answers, shown in ascending `position`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewQuestion {
    pub id: i64,
    pub challenge_id: i64,
    pub position: i32,
    pub text: String,
}

/// DTO for attaching a review question to a challenge.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewQuestionRequest {
    #[validate(range(min = 0))]
    pub position: i32,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}
