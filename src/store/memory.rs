//! In-memory `ProgressStore` for tests. Mirrors the Postgres schema closely enough
//! that the same assertions hold against either implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ProgressStore, StoreError};
use crate::models::{CompletedLesson, EnrolledCourse, Enrollment, PendingAssignment, ProgressSummary};

struct CourseRow {
    title: String,
    description: Option<String>,
    thumbnail_url: Option<String>,
    instructor_id: i64,
}

struct AssignmentRow {
    id: i64,
    lesson_id: i64,
    title: String,
    deadline: DateTime<Utc>,
}

struct SubmissionRow {
    assignment_id: i64,
    user_id: i64,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, String>,
    courses: HashMap<i64, CourseRow>,
    modules: HashMap<i64, i64>, // module id -> course id
    lessons: HashMap<i64, i64>, // lesson id -> module id
    enrollments: BTreeMap<i64, Enrollment>,
    lesson_progress: BTreeMap<(i64, i64), (bool, DateTime<Utc>)>,
    assignments: Vec<AssignmentRow>,
    submissions: Vec<SubmissionRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn course_of_lesson(&self, lesson_id: i64) -> Option<i64> {
        let module = self.lessons.get(&lesson_id)?;
        self.modules.get(module).copied()
    }

    fn completed_for<'a>(
        &'a self,
        enrollment_ids: &'a [i64],
    ) -> impl Iterator<Item = CompletedLesson> + 'a {
        self.lesson_progress
            .iter()
            .filter(move |((e, _), (done, _))| *done && enrollment_ids.contains(e))
            .map(|(&(enrollment_id, lesson_id), &(_, at))| CompletedLesson {
                enrollment_id,
                lesson_id,
                completed_at: Some(at),
            })
    }

    fn user_enrollments(&self, user_id: i64) -> Vec<i64> {
        self.enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.id)
            .collect()
    }
}

pub struct SeededCourse {
    pub id: i64,
    pub lessons: Vec<i64>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    pub fn add_user(&self, name: &str) -> i64 {
        let mut t = self.lock();
        let id = t.next_id();
        t.users.insert(id, name.to_owned());
        id
    }

    /// A course taught by a fresh "Instructor" user, with one module holding
    /// `lessons` lessons.
    pub fn seed_course(&self, lessons: usize) -> SeededCourse {
        let instructor_id = self.add_user("Instructor");
        let mut t = self.lock();
        let id = t.next_id();
        t.courses.insert(
            id,
            CourseRow {
                title: format!("Course {id}"),
                description: None,
                thumbnail_url: None,
                instructor_id,
            },
        );
        let module = t.next_id();
        t.modules.insert(module, id);
        let lessons = (0..lessons)
            .map(|_| {
                let lesson = t.next_id();
                t.lessons.insert(lesson, module);
                lesson
            })
            .collect();
        SeededCourse { id, lessons }
    }

    pub fn enroll(&self, user_id: i64, course_id: i64, enrolled_at: DateTime<Utc>) -> i64 {
        let mut t = self.lock();
        let id = t.next_id();
        t.enrollments.insert(
            id,
            Enrollment {
                id,
                user_id,
                course_id,
                enrolled_at,
                completed_at: None,
                progress: 0,
                last_viewed_lesson_id: None,
            },
        );
        id
    }

    pub fn add_assignment(&self, lesson_id: i64, title: &str, deadline: DateTime<Utc>) -> i64 {
        let mut t = self.lock();
        let id = t.next_id();
        t.assignments.push(AssignmentRow {
            id,
            lesson_id,
            title: title.to_owned(),
            deadline,
        });
        id
    }

    pub fn submit(&self, assignment_id: i64, user_id: i64) {
        self.lock().submissions.push(SubmissionRow {
            assignment_id,
            user_id,
        });
    }

    pub fn enrollment(&self, id: i64) -> Option<Enrollment> {
        self.lock().enrollments.get(&id).cloned()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn complete_lesson(&self, enrollment_id: i64, lesson_id: i64) -> Result<(), StoreError> {
        let mut t = self.lock();
        if !t.enrollments.contains_key(&enrollment_id) || !t.lessons.contains_key(&lesson_id) {
            return Err(StoreError::NotFound);
        }
        t.lesson_progress
            .insert((enrollment_id, lesson_id), (true, Utc::now()));
        Ok(())
    }

    async fn recalculate_progress(&self, enrollment_id: i64) -> Result<ProgressSummary, StoreError> {
        let mut t = self.lock();
        let course_id = t
            .enrollments
            .get(&enrollment_id)
            .map(|e| e.course_id)
            .ok_or(StoreError::NotFound)?;
        let total = t
            .lessons
            .keys()
            .filter(|l| t.course_of_lesson(**l) == Some(course_id))
            .count() as i64;
        let completed = t
            .lesson_progress
            .iter()
            .filter(|((e, _), (done, _))| *e == enrollment_id && *done)
            .count() as i64;

        let summary = ProgressSummary::from_counts(total, completed);
        if let Some(e) = t.enrollments.get_mut(&enrollment_id) {
            e.progress = summary.progress;
            if summary.progress == 100 && e.completed_at.is_none() {
                e.completed_at = Some(Utc::now());
            }
        }
        Ok(summary)
    }

    async fn completed_lessons(&self, enrollment_id: i64) -> Result<Vec<CompletedLesson>, StoreError> {
        let t = self.lock();
        let ids = [enrollment_id];
        let mut rows: Vec<_> = t.completed_for(&ids).collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(a.lesson_id.cmp(&b.lesson_id)));
        Ok(rows)
    }

    async fn completed_lessons_for_user(&self, user_id: i64) -> Result<Vec<CompletedLesson>, StoreError> {
        let t = self.lock();
        let ids = t.user_enrollments(user_id);
        let mut rows: Vec<_> = t.completed_for(&ids).collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(a.lesson_id.cmp(&b.lesson_id)));
        Ok(rows)
    }

    async fn count_completed_lessons_for_user(&self, user_id: i64) -> Result<i64, StoreError> {
        let t = self.lock();
        let ids = t.user_enrollments(user_id);
        Ok(t.completed_for(&ids).count() as i64)
    }

    async fn enrolled_courses(&self, user_id: i64) -> Result<Vec<EnrolledCourse>, StoreError> {
        let t = self.lock();
        let mut rows: Vec<EnrolledCourse> = t
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| {
                let course = t.courses.get(&e.course_id)?;
                let instructor = t.users.get(&course.instructor_id)?;
                Some(EnrolledCourse {
                    enrollment_id: e.id,
                    course_id: e.course_id,
                    title: course.title.clone(),
                    thumbnail_url: course.thumbnail_url.clone(),
                    description: course.description.clone(),
                    instructor_name: instructor.clone(),
                    progress: e.progress,
                    enrolled_at: e.enrolled_at,
                    completed_at: e.completed_at,
                    last_viewed_lesson_id: e.last_viewed_lesson_id,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.enrolled_at
                .cmp(&a.enrolled_at)
                .then(b.enrollment_id.cmp(&a.enrollment_id))
        });
        Ok(rows)
    }

    async fn pending_assignments(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<PendingAssignment>, StoreError> {
        let t = self.lock();
        let mut rows: Vec<PendingAssignment> = t
            .assignments
            .iter()
            .filter_map(|a| {
                let course_id = t.course_of_lesson(a.lesson_id)?;
                let enrolled = t
                    .enrollments
                    .values()
                    .any(|e| e.user_id == user_id && e.course_id == course_id);
                let submitted = t
                    .submissions
                    .iter()
                    .any(|s| s.assignment_id == a.id && s.user_id == user_id);
                (enrolled && !submitted).then(|| PendingAssignment {
                    assignment_id: a.id,
                    assignment_title: a.title.clone(),
                    deadline: a.deadline,
                    lesson_id: a.lesson_id,
                    course_id,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.assignment_id.cmp(&b.assignment_id)));
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn update_last_viewed_lesson(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<Enrollment, StoreError> {
        let mut t = self.lock();
        if !t.lessons.contains_key(&lesson_id) {
            return Err(StoreError::NotFound);
        }
        let e = t
            .enrollments
            .get_mut(&enrollment_id)
            .ok_or(StoreError::NotFound)?;
        e.last_viewed_lesson_id = Some(lesson_id);
        Ok(e.clone())
    }
}
