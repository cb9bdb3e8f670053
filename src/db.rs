use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::Config,
    models::{CompletedLesson, EnrolledCourse, Enrollment, PendingAssignment, ProgressSummary},
    store::{ProgressStore, StoreError},
};

pub type Db = Pool<Postgres>;

pub async fn connect(config: &Config) -> Result<Db> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

// One predicate for "pending" shared by the finder and the dashboard: the user is
// enrolled in the assignment's course and has no submission row for it.
const PENDING_ASSIGNMENTS_SQL: &str = r#"
    SELECT a.id AS assignment_id, a.title AS assignment_title, a.deadline,
           a.lesson_id, m.course_id
    FROM assignments a
    JOIN lessons l ON a.lesson_id = l.id
    JOIN modules m ON l.module_id = m.id
    WHERE EXISTS (
        SELECT 1 FROM enrollments e
        WHERE e.course_id = m.course_id AND e.user_id = $1
    )
    AND NOT EXISTS (
        SELECT 1 FROM submissions s
        WHERE s.assignment_id = a.id AND s.user_id = $1
    )
    ORDER BY a.deadline ASC, a.id ASC
    LIMIT $2
"#;

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn complete_lesson(&self, enrollment_id: i64, lesson_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO lesson_progress (enrollment_id, lesson_id, is_completed, completed_at)
            VALUES ($1, $2, TRUE, now())
            ON CONFLICT (enrollment_id, lesson_id)
            DO UPDATE SET is_completed = TRUE, completed_at = now()
            "#,
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .execute(&self.db)
        .await
        .map_err(StoreError::from_write)?;
        Ok(())
    }

    async fn recalculate_progress(&self, enrollment_id: i64) -> Result<ProgressSummary, StoreError> {
        let mut tx = self.db.begin().await?;

        // Row lock serializes recomputes of one enrollment; the counts below run
        // after it is granted and so see every completion committed before then.
        // NO KEY keeps lesson_progress inserts (FK key-share locks) unblocked.
        let course_id: Option<i64> =
            sqlx::query_scalar("SELECT course_id FROM enrollments WHERE id = $1 FOR NO KEY UPDATE")
                .bind(enrollment_id)
                .fetch_optional(&mut *tx)
                .await?;
        let course_id = course_id.ok_or(StoreError::NotFound)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lessons l
            JOIN modules m ON l.module_id = m.id
            WHERE m.course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        let completed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lesson_progress WHERE enrollment_id = $1 AND is_completed = TRUE",
        )
        .bind(enrollment_id)
        .fetch_one(&mut *tx)
        .await?;

        let summary = ProgressSummary::from_counts(total, completed);

        sqlx::query(
            r#"
            UPDATE enrollments
            SET progress = $1,
                completed_at = CASE WHEN $1 = 100 THEN COALESCE(completed_at, now()) ELSE completed_at END
            WHERE id = $2
            "#,
        )
        .bind(summary.progress)
        .bind(enrollment_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(summary)
    }

    async fn completed_lessons(&self, enrollment_id: i64) -> Result<Vec<CompletedLesson>, StoreError> {
        let rows = sqlx::query_as::<_, CompletedLesson>(
            r#"
            SELECT enrollment_id, lesson_id, completed_at
            FROM lesson_progress
            WHERE enrollment_id = $1 AND is_completed = TRUE
            ORDER BY completed_at DESC, lesson_id ASC
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn completed_lessons_for_user(&self, user_id: i64) -> Result<Vec<CompletedLesson>, StoreError> {
        let rows = sqlx::query_as::<_, CompletedLesson>(
            r#"
            SELECT lp.enrollment_id, lp.lesson_id, lp.completed_at
            FROM lesson_progress lp
            JOIN enrollments e ON lp.enrollment_id = e.id
            WHERE e.user_id = $1 AND lp.is_completed = TRUE
            ORDER BY lp.completed_at DESC, lp.lesson_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count_completed_lessons_for_user(&self, user_id: i64) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lesson_progress lp
            JOIN enrollments e ON lp.enrollment_id = e.id
            WHERE lp.is_completed = TRUE AND e.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn enrolled_courses(&self, user_id: i64) -> Result<Vec<EnrolledCourse>, StoreError> {
        let rows = sqlx::query_as::<_, EnrolledCourse>(
            r#"
            SELECT
                e.id AS enrollment_id,
                c.id AS course_id,
                c.title,
                c.thumbnail_url,
                c.description,
                u.name AS instructor_name,
                e.progress,
                e.enrolled_at,
                e.completed_at,
                e.last_viewed_lesson_id
            FROM enrollments e
            JOIN courses c ON e.course_id = c.id
            JOIN users u ON c.instructor_id = u.id
            WHERE e.user_id = $1
            ORDER BY e.enrolled_at DESC, e.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn pending_assignments(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<PendingAssignment>, StoreError> {
        // LIMIT NULL is LIMIT ALL in Postgres
        let rows = sqlx::query_as::<_, PendingAssignment>(PENDING_ASSIGNMENTS_SQL)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn update_last_viewed_lesson(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<Enrollment, StoreError> {
        let rec = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET last_viewed_lesson_id = $1
            WHERE id = $2
            RETURNING id, user_id, course_id, enrolled_at, completed_at, progress, last_viewed_lesson_id
            "#,
        )
        .bind(lesson_id)
        .bind(enrollment_id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_write)?;
        rec.ok_or(StoreError::NotFound)
    }
}
