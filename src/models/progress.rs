// src/models/progress.rs

use serde::{Serialize, Serializer};

use crate::models::{
    challenge::{Challenge, ReviewQuestion},
    review::Review,
    stack::Stack,
};

/// Per-(challenge, user) progress, computed on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChallengeStatus {
    NotStarted,
    Draft,
    Submitted,
    Blocked,
    Done,
}

impl ChallengeStatus {
    /// Numeric code used by clients (0..=4).
    pub fn code(&self) -> u8 {
        match self {
            ChallengeStatus::NotStarted => 0,
            ChallengeStatus::Draft => 1,
            ChallengeStatus::Submitted => 2,
            ChallengeStatus::Blocked => 3,
            ChallengeStatus::Done => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChallengeStatus::NotStarted => "not_started",
            ChallengeStatus::Draft => "draft",
            ChallengeStatus::Submitted => "submitted",
            ChallengeStatus::Blocked => "blocked",
            ChallengeStatus::Done => "done",
        }
    }
}

impl Serialize for ChallengeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// DTO describing one challenge from the caller's point of view.
#[derive(Debug, Serialize)]
pub struct ChallengeProgress {
    pub challenge: Challenge,
    pub status: ChallengeStatus,
    pub status_label: &'static str,
    pub enabled: bool,
    pub is_first: bool,
    pub is_final: bool,
    pub next_id: Option<i64>,
    pub final_id: i64,
}

/// DTO for the stack overview, challenges in chain order.
#[derive(Debug, Serialize)]
pub struct StackOverview {
    pub stack: Stack,
    pub challenges: Vec<ChallengeProgress>,
}

/// DTO returned when a learner asks for review work.
/// `review` is `None` when no candidate is old enough yet.
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub review: Option<Review>,
    pub elaboration_text: Option<String>,
    pub questions: Vec<ReviewQuestion>,
    pub stack_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ChallengeStatus::NotStarted.code(), 0);
        assert_eq!(ChallengeStatus::Draft.code(), 1);
        assert_eq!(ChallengeStatus::Submitted.code(), 2);
        assert_eq!(ChallengeStatus::Blocked.code(), 3);
        assert_eq!(ChallengeStatus::Done.code(), 4);
    }

    #[test]
    fn test_status_serializes_as_code() {
        assert_eq!(serde_json::to_string(&ChallengeStatus::Blocked).unwrap(), "3");
    }
}
