// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

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

const CHALLENGE_COLUMNS: &str = "id, stack_id, title, description, prerequisite_id, created_at";
const ELABORATION_COLUMNS: &str = "id, challenge_id, user_id, text, created_at, submitted_at";
const REVIEW_COLUMNS: &str =
    "id, elaboration_id, challenge_id, reviewer_id, appraisal, created_at, submitted_at";

/// Raw 'reviews' row; `appraisal` is stored as text.
#[derive(FromRow)]
struct ReviewRow {
    id: i64,
    elaboration_id: i64,
    challenge_id: i64,
    reviewer_id: i64,
    appraisal: String,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = AppError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: row.id,
            elaboration_id: row.elaboration_id,
            challenge_id: row.challenge_id,
            reviewer_id: row.reviewer_id,
            appraisal: row.appraisal.parse()?,
            created_at: row.created_at,
            submitted_at: row.submitted_at,
        })
    }
}

fn into_reviews(rows: Vec<ReviewRow>) -> AppResult<Vec<Review>> {
    rows.into_iter().map(Review::try_from).collect()
}

#[derive(FromRow)]
struct EvaluationRow {
    review_id: i64,
    user_id: i64,
    rating: String,
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn stack_get(&self, id: i64) -> AppResult<Option<Stack>> {
        let stack = sqlx::query_as::<_, Stack>(
            "SELECT id, title, description, created_at FROM stacks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stack)
    }

    async fn stack_insert(&self, title: &str, description: &str) -> AppResult<Stack> {
        let stack = sqlx::query_as::<_, Stack>(
            r#"
            INSERT INTO stacks (title, description)
            VALUES ($1, $2)
            RETURNING id, title, description, created_at
            "#,
        )
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(stack)
    }

    async fn challenge_get(&self, id: i64) -> AppResult<Option<Challenge>> {
        let challenge = sqlx::query_as::<_, Challenge>(&format!(
            "SELECT {} FROM challenges WHERE id = $1",
            CHALLENGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(challenge)
    }

    async fn challenge_list_by_stack(&self, stack_id: i64) -> AppResult<Vec<Challenge>> {
        let challenges = sqlx::query_as::<_, Challenge>(&format!(
            "SELECT {} FROM challenges WHERE stack_id = $1 ORDER BY id",
            CHALLENGE_COLUMNS
        ))
        .bind(stack_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(challenges)
    }

    async fn challenge_insert(&self, new: &NewChallenge) -> AppResult<Challenge> {
        let challenge = sqlx::query_as::<_, Challenge>(&format!(
            r#"
            INSERT INTO challenges (stack_id, title, description, prerequisite_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CHALLENGE_COLUMNS
        ))
        .bind(new.stack_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.prerequisite_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if let AppError::Conflict(_) = err {
                AppError::Conflict("Prerequisite already has a dependent challenge".to_string())
            } else {
                tracing::error!("Failed to insert challenge: {}", err);
                err
            }
        })?;

        Ok(challenge)
    }

    async fn review_questions_for(&self, challenge_id: i64) -> AppResult<Vec<ReviewQuestion>> {
        let questions = sqlx::query_as::<_, ReviewQuestion>(
            r#"
            SELECT id, challenge_id, position, text
            FROM review_questions
            WHERE challenge_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn review_question_insert(
        &self,
        challenge_id: i64,
        position: i32,
        text: &str,
    ) -> AppResult<ReviewQuestion> {
        let question = sqlx::query_as::<_, ReviewQuestion>(
            r#"
            INSERT INTO review_questions (challenge_id, position, text)
            VALUES ($1, $2, $3)
            RETURNING id, challenge_id, position, text
            "#,
        )
        .bind(challenge_id)
        .bind(position)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    async fn elaboration_get(&self, id: i64) -> AppResult<Option<Elaboration>> {
        let elaboration = sqlx::query_as::<_, Elaboration>(&format!(
            "SELECT {} FROM elaborations WHERE id = $1",
            ELABORATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(elaboration)
    }

    async fn elaboration_latest(
        &self,
        challenge_id: i64,
        user_id: i64,
    ) -> AppResult<Option<Elaboration>> {
        let elaboration = sqlx::query_as::<_, Elaboration>(&format!(
            r#"
            SELECT {}
            FROM elaborations
            WHERE challenge_id = $1 AND user_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            ELABORATION_COLUMNS
        ))
        .bind(challenge_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(elaboration)
    }

    async fn elaboration_save_draft(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
    ) -> AppResult<Elaboration> {
        // The conditional update skips submitted rows, so no row comes back.
        let saved = sqlx::query_as::<_, Elaboration>(&format!(
            r#"
            INSERT INTO elaborations (challenge_id, user_id, text)
            VALUES ($1, $2, $3)
            ON CONFLICT (challenge_id, user_id) DO UPDATE
                SET text = EXCLUDED.text
                WHERE elaborations.submitted_at IS NULL
            RETURNING {}
            "#,
            ELABORATION_COLUMNS
        ))
        .bind(challenge_id)
        .bind(user_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        saved.ok_or_else(|| AppError::Conflict("Elaboration was already submitted".to_string()))
    }

    async fn elaboration_submit(
        &self,
        challenge_id: i64,
        user_id: i64,
        text: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Elaboration> {
        let submitted = sqlx::query_as::<_, Elaboration>(&format!(
            r#"
            INSERT INTO elaborations (challenge_id, user_id, text, submitted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (challenge_id, user_id) DO UPDATE
                SET text = EXCLUDED.text, submitted_at = EXCLUDED.submitted_at
                WHERE elaborations.submitted_at IS NULL
            RETURNING {}
            "#,
            ELABORATION_COLUMNS
        ))
        .bind(challenge_id)
        .bind(user_id)
        .bind(text)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        submitted.ok_or_else(|| AppError::Conflict("Elaboration was already submitted".to_string()))
    }

    async fn review_candidates(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
        submitted_before: DateTime<Utc>,
    ) -> AppResult<Vec<Elaboration>> {
        let candidates = sqlx::query_as::<_, Elaboration>(
            r#"
            SELECT e.id, e.challenge_id, e.user_id, e.text, e.created_at, e.submitted_at
            FROM elaborations e
            WHERE e.challenge_id = $1
              AND e.user_id <> $2
              AND e.submitted_at IS NOT NULL
              AND e.submitted_at <= $3
              AND NOT EXISTS (
                  SELECT 1 FROM reviews r
                  WHERE r.elaboration_id = e.id AND r.reviewer_id = $2
              )
            ORDER BY e.submitted_at ASC, e.id ASC
            "#,
        )
        .bind(challenge_id)
        .bind(reviewer_id)
        .bind(submitted_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    async fn review_get(&self, id: i64) -> AppResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    async fn reviews_authored(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
    ) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {}
            FROM reviews
            WHERE challenge_id = $1 AND reviewer_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
            REVIEW_COLUMNS
        ))
        .bind(challenge_id)
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .await?;

        into_reviews(rows)
    }

    async fn reviews_of_elaboration(&self, elaboration_id: i64) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {}
            FROM reviews
            WHERE elaboration_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
            REVIEW_COLUMNS
        ))
        .bind(elaboration_id)
        .fetch_all(&self.pool)
        .await?;

        into_reviews(rows)
    }

    async fn review_find_open(
        &self,
        challenge_id: i64,
        reviewer_id: i64,
    ) -> AppResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {}
            FROM reviews
            WHERE challenge_id = $1 AND reviewer_id = $2 AND submitted_at IS NULL
            "#,
            REVIEW_COLUMNS
        ))
        .bind(challenge_id)
        .bind(reviewer_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    async fn review_open_or_create(
        &self,
        elaboration: &Elaboration,
        reviewer_id: i64,
    ) -> AppResult<Review> {
        // The partial unique index turns a concurrent second insert into a no-op.
        let inserted = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (elaboration_id, challenge_id, reviewer_id, appraisal)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT (reviewer_id, challenge_id) WHERE submitted_at IS NULL DO NOTHING
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(elaboration.id)
        .bind(elaboration.challenge_id)
        .bind(reviewer_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Review::try_from(row);
        }

        self.review_find_open(elaboration.challenge_id, reviewer_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "open review for reviewer {} vanished during assignment",
                    reviewer_id
                ))
            })
    }

    async fn review_submit(
        &self,
        review_id: i64,
        appraisal: Appraisal,
        answers: &[(i64, String)],
        at: DateTime<Utc>,
    ) -> AppResult<Review> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
            SET appraisal = $2, submitted_at = $3
            WHERE id = $1 AND submitted_at IS NULL
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(review_id)
        .bind(appraisal.as_str())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Review was already submitted".to_string()))?;

        for (question_id, text) in answers {
            sqlx::query(
                "INSERT INTO review_answers (review_id, question_id, text) VALUES ($1, $2, $3)",
            )
            .bind(review_id)
            .bind(question_id)
            .bind(text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Review::try_from(row)
    }

    async fn review_answers(&self, review_id: i64) -> AppResult<Vec<ReviewAnswer>> {
        let answers = sqlx::query_as::<_, ReviewAnswer>(
            r#"
            SELECT a.id, a.review_id, a.question_id, a.text
            FROM review_answers a
            JOIN review_questions q ON q.id = a.question_id
            WHERE a.review_id = $1
            ORDER BY q.position ASC, a.id ASC
            "#,
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn review_evaluation_upsert(
        &self,
        review_id: i64,
        user_id: i64,
        rating: ReviewRating,
    ) -> AppResult<ReviewEvaluation> {
        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            INSERT INTO review_evaluations (review_id, user_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (review_id, user_id) DO UPDATE SET rating = EXCLUDED.rating
            RETURNING review_id, user_id, rating
            "#,
        )
        .bind(review_id)
        .bind(user_id)
        .bind(rating.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(ReviewEvaluation {
            review_id: row.review_id,
            user_id: row.user_id,
            rating: row.rating.parse()?,
        })
    }
}
