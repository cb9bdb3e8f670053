use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{CompletedLesson, EnrolledCourse, Enrollment, PendingAssignment, ProgressSummary};

#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Foreign-key violations mean the caller referenced an id that does not exist.
    pub fn from_write(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
            _ => StoreError::Database(e),
        }
    }
}

pub type Store = Arc<dyn ProgressStore>;

/// Persistence operations behind the progress endpoints.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Upsert the (enrollment, lesson) completion fact and refresh its timestamp.
    async fn complete_lesson(&self, enrollment_id: i64, lesson_id: i64) -> Result<(), StoreError>;

    /// Recount lessons and completions for the enrollment and persist the derived
    /// percentage. Returns `NotFound` for an unknown enrollment.
    async fn recalculate_progress(&self, enrollment_id: i64) -> Result<ProgressSummary, StoreError>;

    async fn completed_lessons(&self, enrollment_id: i64) -> Result<Vec<CompletedLesson>, StoreError>;

    async fn completed_lessons_for_user(&self, user_id: i64) -> Result<Vec<CompletedLesson>, StoreError>;

    async fn count_completed_lessons_for_user(&self, user_id: i64) -> Result<i64, StoreError>;

    /// Enrollments of the user with course display data, newest first.
    async fn enrolled_courses(&self, user_id: i64) -> Result<Vec<EnrolledCourse>, StoreError>;

    /// Assignments in enrolled courses with no submission by the user, earliest
    /// deadline first. `None` returns every match.
    async fn pending_assignments(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<PendingAssignment>, StoreError>;

    async fn update_last_viewed_lesson(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<Enrollment, StoreError>;
}
