// src/notify.rs

//! Review notifications.
//!
//! Delivery is best effort. A submitted review is the fact of record, so
//! [`dispatch_review_notification`] logs failures and never returns them.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::review::{Appraisal, Review};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification storage failed: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// The reviewed work was judged missing or unusable.
    async fn notify_blocking_review(&self, review: &Review) -> Result<(), NotificationError>;

    /// The reviewed work received a verdict.
    async fn notify_quorum_reached(&self, review: &Review) -> Result<(), NotificationError>;
}

/// Sends the notification matching the review's appraisal and swallows
/// failures after logging them.
pub async fn dispatch_review_notification(notifier: &dyn Notifier, review: &Review) {
    let (kind, result) = if review.appraisal == Appraisal::Pending {
        ("blocking_review", notifier.notify_blocking_review(review).await)
    } else {
        ("quorum_reached", notifier.notify_quorum_reached(review).await)
    };

    if let Err(e) = result {
        tracing::warn!(
            review_id = review.id,
            elaboration_id = review.elaboration_id,
            reviewer_id = review.reviewer_id,
            kind,
            error = %e,
            "Could not send review notification"
        );
    }
}

/// Writes notifications to the log only.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_blocking_review(&self, review: &Review) -> Result<(), NotificationError> {
        tracing::info!(review_id = review.id, elaboration_id = review.elaboration_id, "Blocking review");
        Ok(())
    }

    async fn notify_quorum_reached(&self, review: &Review) -> Result<(), NotificationError> {
        tracing::info!(review_id = review.id, elaboration_id = review.elaboration_id, "Review received");
        Ok(())
    }
}

/// Stores a notification row for the author of the reviewed elaboration.
pub struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn notify_author(&self, review: &Review, message: &str) -> Result<(), NotificationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, review_id, message)
            SELECT e.user_id, $2, $3
            FROM elaborations e
            WHERE e.id = $1
            "#,
        )
        .bind(review.elaboration_id)
        .bind(review.id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::Delivery(format!(
                "elaboration {} has no author",
                review.elaboration_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify_blocking_review(&self, review: &Review) -> Result<(), NotificationError> {
        self.notify_author(
            review,
            "A reviewer could not find usable work in your submission. Please get in touch with the course staff.",
        )
        .await
    }

    async fn notify_quorum_reached(&self, review: &Review) -> Result<(), NotificationError> {
        self.notify_author(review, "Your submission received a new peer review.")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingNotifier {
        blocking: AtomicUsize,
        reached: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify_blocking_review(&self, _: &Review) -> Result<(), NotificationError> {
            self.blocking.fetch_add(1, Ordering::SeqCst);
            Err(NotificationError::Delivery("mailer down".to_string()))
        }

        async fn notify_quorum_reached(&self, _: &Review) -> Result<(), NotificationError> {
            self.reached.fetch_add(1, Ordering::SeqCst);
            Err(NotificationError::Delivery("mailer down".to_string()))
        }
    }

    fn review(appraisal: Appraisal) -> Review {
        Review {
            id: 1,
            elaboration_id: 2,
            challenge_id: 3,
            reviewer_id: 4,
            appraisal,
            created_at: Utc::now(),
            submitted_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_appraisal_and_swallows_errors() {
        let notifier = FailingNotifier::default();

        dispatch_review_notification(&notifier, &review(Appraisal::Pending)).await;
        dispatch_review_notification(&notifier, &review(Appraisal::Success)).await;
        dispatch_review_notification(&notifier, &review(Appraisal::Fail)).await;

        assert_eq!(notifier.blocking.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.reached.load(Ordering::SeqCst), 2);
    }
}
