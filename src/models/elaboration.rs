// src/models/elaboration.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'elaborations' table in the database.
/// One learner's work for one challenge.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Elaboration {
    pub id: i64,
    pub challenge_id: i64,
    pub user_id: i64,

    /// Sanitized HTML body.
    pub text: String,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// `None` while the elaboration is still a draft.
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Elaboration {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

/// DTO for saving a draft or submitting an elaboration.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveElaborationRequest {
    #[validate(length(max = 100000))]
    pub text: String,
}
