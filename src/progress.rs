use tracing::instrument;

use crate::models::{CompletedLesson, DashboardOverview, EnrolledCourse, PendingAssignment, ProgressSummary};
use crate::store::{ProgressStore, StoreError};

/// Cap on the pending list shown on the dashboard.
pub const DASHBOARD_PENDING_LIMIT: i64 = 5;

/// Whole-number percentage of `completed` out of `total`, rounding halves up.
///
/// An empty course is 0%. Completions beyond the lesson count (a lesson moved to
/// another course after it was completed) are clamped so the result stays in 0..=100.
pub fn percent_complete(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    let completed = completed.clamp(0, total);
    // round(100 * c / t) == floor((200c + t) / 2t) for non-negative integers
    ((200 * completed + total) / (2 * total)) as i32
}

impl ProgressSummary {
    pub fn from_counts(total: i64, completed: i64) -> Self {
        Self {
            total,
            completed,
            progress: percent_complete(completed, total),
        }
    }
}

/// Record the completion and recompute the enrollment's progress from scratch.
#[instrument(skip(store))]
pub async fn complete_lesson(
    store: &dyn ProgressStore,
    enrollment_id: i64,
    lesson_id: i64,
) -> Result<ProgressSummary, StoreError> {
    store.complete_lesson(enrollment_id, lesson_id).await?;
    let summary = store.recalculate_progress(enrollment_id).await?;
    tracing::info!(progress = summary.progress, "lesson completed");
    Ok(summary)
}

#[instrument(skip(store))]
pub async fn calculate_progress(
    store: &dyn ProgressStore,
    enrollment_id: i64,
) -> Result<ProgressSummary, StoreError> {
    store.recalculate_progress(enrollment_id).await
}

/// The three reads run concurrently; they share no snapshot, which is fine for
/// a dashboard.
#[instrument(skip(store))]
pub async fn dashboard_overview(
    store: &dyn ProgressStore,
    user_id: i64,
) -> Result<DashboardOverview, StoreError> {
    let (courses, completed_lessons, pending_assignments) = tokio::try_join!(
        store.enrolled_courses(user_id),
        store.count_completed_lessons_for_user(user_id),
        store.pending_assignments(user_id, Some(DASHBOARD_PENDING_LIMIT)),
    )?;
    Ok(DashboardOverview {
        courses,
        completed_lessons,
        pending_assignments,
    })
}

pub async fn pending_assignments(
    store: &dyn ProgressStore,
    user_id: i64,
) -> Result<Vec<PendingAssignment>, StoreError> {
    store.pending_assignments(user_id, None).await
}

pub async fn enrolled_courses(
    store: &dyn ProgressStore,
    user_id: i64,
) -> Result<Vec<EnrolledCourse>, StoreError> {
    store.enrolled_courses(user_id).await
}

pub async fn completed_lessons(
    store: &dyn ProgressStore,
    enrollment_id: i64,
) -> Result<Vec<CompletedLesson>, StoreError> {
    store.completed_lessons(enrollment_id).await
}

pub async fn completed_lessons_for_user(
    store: &dyn ProgressStore,
    user_id: i64,
) -> Result<Vec<CompletedLesson>, StoreError> {
    store.completed_lessons_for_user(user_id).await
}
