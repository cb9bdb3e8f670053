use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::{
    models::*,
    progress,
    store::{Store, StoreError},
};

type ApiError = (StatusCode, String);

pub fn router(store: Store) -> Router {
    Router::new()
        // lesson completion + progress
        .route("/api/progress/complete", post(complete_lesson))
        .route("/api/progress/enrollments/:enrollment_id", get(get_progress))
        .route("/api/progress/enrollments/:enrollment_id/lessons", get(enrollment_completed_lessons))
        // enrollment views
        .route("/api/enrollments/dashboard-overview/:user_id", get(dashboard_overview))
        .route("/api/enrollments/user/:user_id/with-courses", get(enrolled_courses))
        .route("/api/enrollments/user/:user_id/completed-lessons", get(user_completed_lessons))
        .route("/api/enrollments/last-viewed", post(update_last_viewed))
        // pending work
        .route("/api/assignments/pending/user/:user_id", get(pending_assignments))
        .with_state(store)
}

async fn complete_lesson(
    State(store): State<Store>,
    Json(req): Json<CompleteLessonReq>,
) -> Result<Json<CompleteLessonResp>, ApiError> {
    req.validate().map_err(e400)?;
    let summary = progress::complete_lesson(store.as_ref(), req.enrollment_id, req.lesson_id)
        .await
        .map_err(|e| store_err(e, "enrollment or lesson not found"))?;
    Ok(Json(CompleteLessonResp {
        message: "Lesson marked as completed".into(),
        progress: summary,
    }))
}

async fn get_progress(
    State(store): State<Store>,
    Path(enrollment_id): Path<i64>,
) -> Result<Json<ProgressSummary>, ApiError> {
    let enrollment_id = positive(enrollment_id, "enrollment id")?;
    let summary = progress::calculate_progress(store.as_ref(), enrollment_id)
        .await
        .map_err(|e| store_err(e, "enrollment not found"))?;
    Ok(Json(summary))
}

async fn enrollment_completed_lessons(
    State(store): State<Store>,
    Path(enrollment_id): Path<i64>,
) -> Result<Json<Vec<CompletedLesson>>, ApiError> {
    let enrollment_id = positive(enrollment_id, "enrollment id")?;
    let rows = progress::completed_lessons(store.as_ref(), enrollment_id)
        .await
        .map_err(|e| store_err(e, "enrollment not found"))?;
    Ok(Json(rows))
}

async fn dashboard_overview(
    State(store): State<Store>,
    Path(user_id): Path<i64>,
) -> Result<Json<DashboardOverview>, ApiError> {
    let user_id = positive(user_id, "user id")?;
    let overview = progress::dashboard_overview(store.as_ref(), user_id)
        .await
        .map_err(|e| store_err(e, "user not found"))?;
    Ok(Json(overview))
}

async fn enrolled_courses(
    State(store): State<Store>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<EnrolledCourse>>, ApiError> {
    let user_id = positive(user_id, "user id")?;
    let rows = progress::enrolled_courses(store.as_ref(), user_id)
        .await
        .map_err(|e| store_err(e, "user not found"))?;
    Ok(Json(rows))
}

async fn user_completed_lessons(
    State(store): State<Store>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<CompletedLesson>>, ApiError> {
    let user_id = positive(user_id, "user id")?;
    let rows = progress::completed_lessons_for_user(store.as_ref(), user_id)
        .await
        .map_err(|e| store_err(e, "user not found"))?;
    Ok(Json(rows))
}

async fn update_last_viewed(
    State(store): State<Store>,
    Json(req): Json<LastViewedReq>,
) -> Result<Json<Enrollment>, ApiError> {
    req.validate().map_err(e400)?;
    let rec = store
        .update_last_viewed_lesson(req.enrollment_id, req.lesson_id)
        .await
        .map_err(|e| store_err(e, "enrollment or lesson not found"))?;
    Ok(Json(rec))
}

async fn pending_assignments(
    State(store): State<Store>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<PendingAssignment>>, ApiError> {
    let user_id = positive(user_id, "user id")?;
    let rows = progress::pending_assignments(store.as_ref(), user_id)
        .await
        .map_err(|e| store_err(e, "user not found"))?;
    Ok(Json(rows))
}

// --- helpers ---
fn positive(id: i64, what: &str) -> Result<i64, ApiError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(e400(format!("invalid {what}")))
    }
}

fn store_err(e: StoreError, not_found: &str) -> ApiError {
    match e {
        StoreError::NotFound => e404(not_found),
        other => e500(other),
    }
}

fn e400<T: Into<String>>(msg: T) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn e404<T: Into<String>>(msg: T) -> ApiError {
    (StatusCode::NOT_FOUND, msg.into())
}

// Storage details stay in the log; clients get a generic retry-later message.
fn e500<E: std::fmt::Display>(e: E) -> ApiError {
    tracing::error!(error=%e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "unable to load progress right now, try again later".into(),
    )
}
