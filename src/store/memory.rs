// src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        challenge::{Challenge, ReviewQuestion},
        elaboration::Elaboration,
        review::{Appraisal, Review, ReviewAnswer, ReviewEvaluation, ReviewRating},
        stack::Stack,
    },
    store::{NewChallenge, Store},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    stacks: Vec<Stack>,
    challenges: Vec<Challenge>,
    questions: Vec<ReviewQuestion>,
    elaborations: Vec<Elaboration>,
    reviews: Vec<Review>,
    answers: Vec<ReviewAnswer>,
    evaluations: Vec<ReviewEvaluation>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn latest_elaboration_mut(&mut self, challenge_id: i64, user_id: i64) -> Option<&mut Elaboration> {
        self.elaborations
            .iter_mut()
            .filter(|e| e.challenge_id == challenge_id && e.user_id == user_id)
            .max_by_key(|e| (e.created_at, e.id))
    }

    fn open_review(&self, challenge_id: i64, reviewer_id: i64) -> Option<&Review> {
        self.reviews
            .iter()
            .find(|r| r.challenge_id == challenge_id && r.reviewer_id == reviewer_id && r.is_open())
    }
}

/// In-process store with the same constraints as the PostgreSQL schema.
/// Every operation runs under one lock, which makes each of them atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an elaboration with explicit timestamps, bypassing the
    /// draft/submit flow. Used to set up fixtures with aged submissions.
    ///
    /// Skips the one-per-(challenge, user) check; fixtures only.
    #[doc(hidden)]
    pub async fn seed_elaboration(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Elaboration {
        let mut tables = self.tables.lock().await;
        let id = tables.id();
        let elaboration = Elaboration {
            id,
            challenge_id,
            user_id,
            text: text.to_string(),
            created_at: submitted_at.unwrap_or_else(Utc::now),
            submitted_at,
        };
        tables.elaborations.push(elaboration.clone());
        elaboration
    }

    /// Inserts a review row directly, open when `submitted_at` is `None`.
    ///
    /// Skips the open-assignment and reviewer/author checks; fixtures only.
    #[doc(hidden)]
    pub async fn seed_review(
        &self,
        elaboration: &Elaboration,
        reviewer_id: i64,
        appraisal: Appraisal,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Review {
        let mut tables = self.tables.lock().await;
        let id = tables.id();
        let review = Review {
            id,
            elaboration_id: elaboration.id,
            challenge_id: elaboration.challenge_id,
            reviewer_id,
            appraisal,
            created_at: Utc::now(),
            submitted_at,
        };
        tables.reviews.push(review.clone());
        review
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn stack_get(&self, id: i64) -> AppResult<Option<Stack>> {
        let tables = self.tables.lock().await;
        Ok(tables.stacks.iter().find(|s| s.id == id).cloned())
    }

    async fn stack_insert(&self, title: &str, description: &str) -> AppResult<Stack> {
        let mut tables = self.tables.lock().await;
        let stack = Stack {
            id: tables.id(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        tables.stacks.push(stack.clone());
        Ok(stack)
    }

    async fn challenge_get(&self, id: i64) -> AppResult<Option<Challenge>> {
        let tables = self.tables.lock().await;
        Ok(tables.challenges.iter().find(|c| c.id == id).cloned())
    }

    async fn challenge_list_by_stack(&self, stack_id: i64) -> AppResult<Vec<Challenge>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .challenges
            .iter()
            .filter(|c| c.stack_id == stack_id)
            .cloned()
            .collect())
    }

    async fn challenge_insert(&self, new: &NewChallenge) -> AppResult<Challenge> {
        let mut tables = self.tables.lock().await;

        if !tables.stacks.iter().any(|s| s.id == new.stack_id) {
            return Err(AppError::NotFound("Stack not found".to_string()));
        }
        let taken = tables.challenges.iter().any(|c| match new.prerequisite_id {
            Some(prerequisite) => c.prerequisite_id == Some(prerequisite),
            None => c.stack_id == new.stack_id && c.prerequisite_id.is_none(),
        });
        if taken {
            return Err(AppError::Conflict(
                "Prerequisite already has a dependent challenge".to_string(),
            ));
        }

        let challenge = Challenge {
            id: tables.id(),
            stack_id: new.stack_id,
            title: new.title.clone(),
            description: new.description.clone(),
            prerequisite_id: new.prerequisite_id,
            created_at: Utc::now(),
        };
        tables.challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn review_questions_for(&self, challenge_id: i64) -> AppResult<Vec<ReviewQuestion>> {
        let tables = self.tables.lock().await;
        let mut questions: Vec<ReviewQuestion> = tables
            .questions
            .iter()
            .filter(|q| q.challenge_id == challenge_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.position, q.id));
        Ok(questions)
    }

    async fn review_question_insert(
        &self,
        challenge_id: i64,
        position: i32,
        text: &str,
    ) -> AppResult<ReviewQuestion> {
        let mut tables = self.tables.lock().await;
        let question = ReviewQuestion {
            id: tables.id(),
            challenge_id,
            position,
            text: text.to_string(),
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn elaboration_get(&self, id: i64) -> AppResult<Option<Elaboration>> {
        let tables = self.tables.lock().await;
        Ok(tables.elaborations.iter().find(|e| e.id == id).cloned())
    }

    async fn elaboration_latest(
        &self,
        challenge_id: i64,
        user_id: i64,
    ) -> AppResult<Option<Elaboration>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.latest_elaboration_mut(challenge_id, user_id).cloned())
    }

    async fn elaboration_save_draft(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
    ) -> AppResult<Elaboration> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables.latest_elaboration_mut(challenge_id, user_id) {
            if existing.is_submitted() {
                return Err(AppError::Conflict("Elaboration was already submitted".to_string()));
            }
            existing.text = text.to_string();
            return Ok(existing.clone());
        }

        let elaboration = Elaboration {
            id: tables.id(),
            challenge_id,
            user_id,
            text: text.to_string(),
            created_at: Utc::now(),
            submitted_at: None,
        };
        tables.elaborations.push(elaboration.clone());
        Ok(elaboration)
    }

    async fn elaboration_submit(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Elaboration> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables.latest_elaboration_mut(challenge_id, user_id) {
            if existing.is_submitted() {
                return Err(AppError::Conflict("Elaboration was already submitted".to_string()));
            }
            existing.text = text.to_string();
            existing.submitted_at = Some(at);
            return Ok(existing.clone());
        }

        let elaboration = Elaboration {
            id: tables.id(),
            challenge_id,
            user_id,
            text: text.to_string(),
            created_at: at,
            submitted_at: Some(at),
        };
        tables.elaborations.push(elaboration.clone());
        Ok(elaboration)
    }

    async fn review_candidates(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
        submitted_before: DateTime<Utc>,
    ) -> AppResult<Vec<Elaboration>> {
        let tables = self.tables.lock().await;
        let mut candidates: Vec<Elaboration> = tables
            .elaborations
            .iter()
            .filter(|e| e.challenge_id == challenge_id && e.user_id != reviewer_id)
            .filter(|e| matches!(e.submitted_at, Some(at) if at <= submitted_before))
            .filter(|e| {
                !tables
                    .reviews
                    .iter()
                    .any(|r| r.elaboration_id == e.id && r.reviewer_id == reviewer_id)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|e| (e.submitted_at, e.id));
        Ok(candidates)
    }

    async fn review_get(&self, id: i64) -> AppResult<Option<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn reviews_authored(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
    ) -> AppResult<Vec<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reviews
            .iter()
            .filter(|r| r.challenge_id == challenge_id && r.reviewer_id == reviewer_id)
            .cloned()
            .collect())
    }

    async fn reviews_of_elaboration(&self, elaboration_id: i64) -> AppResult<Vec<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reviews
            .iter()
            .filter(|r| r.elaboration_id == elaboration_id)
            .cloned()
            .collect())
    }

    async fn review_find_open(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
    ) -> AppResult<Option<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables.open_review(challenge_id, reviewer_id).cloned())
    }

    async fn review_open_or_create(
        &self,
        elaboration: &Elaboration,
        reviewer_id: i64,
    ) -> AppResult<Review> {
        let mut tables = self.tables.lock().await;

        if let Some(open) = tables.open_review(elaboration.challenge_id, reviewer_id) {
            return Ok(open.clone());
        }

        let review = Review {
            id: tables.id(),
            elaboration_id: elaboration.id,
            challenge_id: elaboration.challenge_id,
            reviewer_id,
            appraisal: Appraisal::Pending,
            created_at: Utc::now(),
            submitted_at: None,
        };
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn review_submit(
        &self,
        review_id: i64,
        appraisal: Appraisal,
        answers: &[(i64, String)],
        at: DateTime<Utc>,
    ) -> AppResult<Review> {
        let mut tables = self.tables.lock().await;

        let index = tables
            .reviews
            .iter()
            .position(|r| r.id == review_id)
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        if !tables.reviews[index].is_open() {
            return Err(AppError::Conflict("Review was already submitted".to_string()));
        }

        for (question_id, text) in answers {
            let id = tables.id();
            tables.answers.push(ReviewAnswer {
                id,
                review_id,
                question_id: *question_id,
                text: text.clone(),
            });
        }

        let review = &mut tables.reviews[index];
        review.appraisal = appraisal;
        review.submitted_at = Some(at);
        Ok(review.clone())
    }

    async fn review_answers(&self, review_id: i64) -> AppResult<Vec<ReviewAnswer>> {
        let tables = self.tables.lock().await;
        let position_of = |question_id: i64| {
            tables
                .questions
                .iter()
                .find(|q| q.id == question_id)
                .map(|q| q.position)
                .unwrap_or(i32::MAX)
        };
        let mut answers: Vec<ReviewAnswer> = tables
            .answers
            .iter()
            .filter(|a| a.review_id == review_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| (position_of(a.question_id), a.id));
        Ok(answers)
    }

    async fn review_evaluation_upsert(
        &self,
        review_id: i64,
        user_id: i64,
        rating: ReviewRating,
    ) -> AppResult<ReviewEvaluation> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables
            .evaluations
            .iter_mut()
            .find(|e| e.review_id == review_id && e.user_id == user_id)
        {
            existing.rating = rating;
            return Ok(existing.clone());
        }

        let evaluation = ReviewEvaluation {
            review_id,
            user_id,
            rating,
        };
        tables.evaluations.push(evaluation.clone());
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_challenge() -> (MemoryStore, Challenge) {
        let store = MemoryStore::new();
        let stack = store.stack_insert("stack", "").await.unwrap();
        let challenge = store
            .challenge_insert(&NewChallenge {
                stack_id: stack.id,
                title: "first".to_string(),
                description: String::new(),
                prerequisite_id: None,
            })
            .await
            .unwrap();
        (store, challenge)
    }

    #[tokio::test]
    async fn test_draft_then_submit_keeps_one_row() {
        let (store, challenge) = store_with_challenge().await;

        let draft = store.elaboration_save_draft(challenge.id, 7, "a").await.unwrap();
        let draft_again = store.elaboration_save_draft(challenge.id, 7, "b").await.unwrap();
        assert_eq!(draft.id, draft_again.id);
        assert_eq!(draft_again.text, "b");

        let submitted = store
            .elaboration_submit(challenge.id, 7, "final", Utc::now())
            .await
            .unwrap();
        assert_eq!(submitted.id, draft.id);
        assert!(submitted.is_submitted());

        let err = store.elaboration_save_draft(challenge.id, 7, "late").await;
        assert!(matches!(err, Err(AppError::Conflict(_))));
        let err = store
            .elaboration_submit(challenge.id, 7, "again", Utc::now())
            .await;
        assert!(matches!(err, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_second_dependent_rejected() {
        let (store, first) = store_with_challenge().await;
        let second = NewChallenge {
            stack_id: first.stack_id,
            title: "second".to_string(),
            description: String::new(),
            prerequisite_id: Some(first.id),
        };
        store.challenge_insert(&second).await.unwrap();
        let err = store.challenge_insert(&second).await;
        assert!(matches!(err, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_open_or_create_reuses_open_review() {
        let (store, challenge) = store_with_challenge().await;
        let a = store
            .seed_elaboration(challenge.id, 1, "a", Some(Utc::now()))
            .await;
        let b = store
            .seed_elaboration(challenge.id, 2, "b", Some(Utc::now()))
            .await;

        let first = store.review_open_or_create(&a, 3).await.unwrap();
        let second = store.review_open_or_create(&b, 3).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.elaboration_id, a.id);

        store
            .review_submit(first.id, Appraisal::Success, &[], Utc::now())
            .await
            .unwrap();
        let third = store.review_open_or_create(&b, 3).await.unwrap();
        assert_ne!(third.id, first.id);
        assert_eq!(third.elaboration_id, b.id);
    }
}
