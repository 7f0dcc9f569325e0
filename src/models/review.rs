// src/models/review.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// A reviewer's verdict on an elaboration.
/// Stored as lowercase text in the 'reviews.appraisal' column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appraisal {
    /// Nothing yet. On a submitted review it means the work was missing or unusable.
    Pending,
    Success,
    Fail,
}

impl Appraisal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Appraisal::Pending => "pending",
            Appraisal::Success => "success",
            Appraisal::Fail => "fail",
        }
    }
}

impl fmt::Display for Appraisal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Appraisal {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Appraisal::Pending),
            "success" => Ok(Appraisal::Success),
            "fail" => Ok(Appraisal::Fail),
            other => Err(AppError::InternalServerError(format!(
                "unknown appraisal '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'reviews' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: i64,

    /// The elaboration under review.
    pub elaboration_id: i64,

    /// Copied from the elaboration so open assignments can be
    /// constrained per (reviewer, challenge).
    pub challenge_id: i64,

    pub reviewer_id: i64,
    pub appraisal: Appraisal,
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// `None` while the assignment is still open.
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Review {
    pub fn is_open(&self) -> bool {
        self.submitted_at.is_none()
    }
}

/// Represents the 'review_answers' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewAnswer {
    pub id: i64,
    pub review_id: i64,
    pub question_id: i64,
    pub text: String,
}

/// One answer inside a review submission.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerInput {
    pub question_id: i64,
    #[validate(length(max = 20000))]
    pub answer: String,
}

/// DTO for submitting an open review.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReviewRequest {
    pub appraisal: Appraisal,
    #[validate(nested)]
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
}

/// A submitted review as shown to the author of the reviewed work.
/// The reviewer's identity is not exposed.
#[derive(Debug, Serialize)]
pub struct ReceivedReview {
    pub id: i64,
    pub appraisal: Appraisal,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub answers: Vec<ReviewAnswer>,
}

/// How helpful the author found a review of their work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRating {
    Positive,
    Negative,
}

impl ReviewRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewRating::Positive => "positive",
            ReviewRating::Negative => "negative",
        }
    }
}

impl FromStr for ReviewRating {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(ReviewRating::Positive),
            "negative" => Ok(ReviewRating::Negative),
            other => Err(AppError::InternalServerError(format!(
                "unknown review rating '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'review_evaluations' table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEvaluation {
    pub review_id: i64,
    pub user_id: i64,
    pub rating: ReviewRating,
}

/// DTO for rating a received review.
#[derive(Debug, Deserialize)]
pub struct EvaluateReviewRequest {
    pub rating: ReviewRating,
}
