use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: i32, // 0..=100, derived from lesson_progress
    pub last_viewed_lesson_id: Option<i64>,
}

/// Result of a full progress recompute for one enrollment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total: i64,
    pub completed: i64,
    pub progress: i32,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletedLesson {
    pub enrollment_id: i64,
    pub lesson_id: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An enrollment joined with the course and instructor display fields.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnrolledCourse {
    pub enrollment_id: i64,
    pub course_id: i64,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub instructor_name: String,
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_viewed_lesson_id: Option<i64>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingAssignment {
    pub assignment_id: i64,
    pub assignment_title: String,
    pub deadline: DateTime<Utc>,
    pub lesson_id: i64,
    pub course_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub courses: Vec<EnrolledCourse>,
    pub completed_lessons: i64,
    pub pending_assignments: Vec<PendingAssignment>,
}

// Request bodies. Ids may arrive as JSON numbers or numeric strings.

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonReq {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub enrollment_id: i64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub lesson_id: i64,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LastViewedReq {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub enrollment_id: i64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub lesson_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompleteLessonResp {
    pub message: String,
    pub progress: ProgressSummary,
}

/// Both lesson-addressed requests carry the same pair of ids.
pub fn validate_ids(enrollment_id: i64, lesson_id: i64) -> Result<(), &'static str> {
    if enrollment_id <= 0 {
        return Err("enrollmentId must be a positive integer");
    }
    if lesson_id <= 0 {
        return Err("lessonId must be a positive integer");
    }
    Ok(())
}

impl CompleteLessonReq {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_ids(self.enrollment_id, self.lesson_id)
    }
}

impl LastViewedReq {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_ids(self.enrollment_id, self.lesson_id)
    }
}
