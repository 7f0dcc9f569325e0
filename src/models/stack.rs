// src/models/stack.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'stacks' table in the database.
/// A stack groups one prerequisite chain of challenges.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stack {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new stack.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStackRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
}
