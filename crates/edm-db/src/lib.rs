//! edm-db
//!
//! Persistence for users, courses, lessons, enrollments, lesson progress and
//! the achievement ledger, behind one async [`Store`] trait.
//!
//! Two implementations:
//! - [`PgStore`]: Postgres via sqlx, schema from embedded migrations.
//! - [`MemStore`]: in-process maps with the same semantics, used when no
//!   database URL is configured and by the route tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edm_schemas::{
    AchievementRecord, CompletedLesson, Course, CourseDetail, CourseFilter, CoursePatch,
    CourseSummary, EnrolledCourse, Enrollment, EnrollmentStatus, Lesson, LessonPatch,
    LessonProgress, NewAchievementRecord, NewCourse, NewLesson, NewUser, User, UserPatch,
};
use uuid::Uuid;

mod mem;
mod pg;
mod seed;

pub use mem::MemStore;
pub use pg::{connect, connect_from_env, migrate, status, DbStatus, PgStore};
pub use seed::{seed_demo, SeedReport, DEMO_PASSWORD};

pub const ENV_DB_URL: &str = "EDM_DATABASE_URL";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    /// Unique constraint hit; the message names the field.
    #[error("{0}")]
    Conflict(String),
    #[error("stored value is invalid: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Lesson progress upsert result.
#[derive(Debug, Clone)]
pub struct LessonCompletion {
    pub progress: LessonProgress,
    /// False when the lesson was already marked completed before this call.
    pub newly_completed: bool,
}

/// Enrollment progress update result.
#[derive(Debug, Clone)]
pub struct EnrollmentUpdate {
    pub enrollment: Enrollment,
    /// True only for the call that moved the enrollment to COMPLETED.
    pub newly_completed: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- users --------------------------------------------------------------

    /// `Conflict` names `email` or `username` when either is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Exact match; callers lower-case emails before storing and looking up.
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> StoreResult<User>;
    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    /// Adds to the points balance and returns the new balance.
    async fn add_points(&self, id: Uuid, points: i64) -> StoreResult<i64>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    // -- courses ------------------------------------------------------------

    /// Newest first.
    async fn list_courses(&self, filter: &CourseFilter) -> StoreResult<Vec<CourseSummary>>;
    async fn course_by_id(&self, id: Uuid) -> StoreResult<Option<CourseDetail>>;
    async fn create_course(&self, new: NewCourse) -> StoreResult<Course>;
    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> StoreResult<Course>;
    /// Removes the course with its lessons, enrollments and lesson progress.
    async fn delete_course(&self, id: Uuid) -> StoreResult<()>;

    // -- lessons ------------------------------------------------------------

    async fn lesson_by_id(&self, id: Uuid) -> StoreResult<Option<Lesson>>;
    /// `NotFound` when the course does not exist.
    async fn create_lesson(&self, course_id: Uuid, new: NewLesson) -> StoreResult<Lesson>;
    async fn update_lesson(&self, id: Uuid, patch: LessonPatch) -> StoreResult<Lesson>;
    async fn delete_lesson(&self, id: Uuid) -> StoreResult<()>;
    async fn count_lessons(&self, course_id: Uuid) -> StoreResult<i64>;

    // -- enrollments --------------------------------------------------------

    async fn enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Option<Enrollment>>;
    /// `Conflict` when the user is already enrolled.
    async fn create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Enrollment>;
    /// Newest first.
    async fn enrollments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<EnrolledCourse>>;
    /// `completed_at = Some(..)` also flips the status to COMPLETED unless
    /// it already is; the existing completion time is then kept. Of any
    /// number of concurrent completing calls exactly one reports
    /// `newly_completed`.
    async fn set_enrollment_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        progress: f64,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<EnrollmentUpdate>;
    async fn count_enrollments_for_user(
        &self,
        user_id: Uuid,
        status: Option<EnrollmentStatus>,
    ) -> StoreResult<i64>;

    // -- lesson progress ----------------------------------------------------

    async fn lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> StoreResult<Option<LessonProgress>>;
    /// Marks a lesson completed for the user, creating the row if needed.
    async fn upsert_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        time_spent: i32,
        at: DateTime<Utc>,
    ) -> StoreResult<LessonCompletion>;
    /// Completed lessons overall, or within one course.
    async fn count_completed_lessons(
        &self,
        user_id: Uuid,
        course_id: Option<Uuid>,
    ) -> StoreResult<i64>;
    /// Completions at or after `since`, newest first.
    async fn recent_completions(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<CompletedLesson>>;

    // -- achievement ledger -------------------------------------------------

    async fn create_achievement_record(
        &self,
        new: NewAchievementRecord,
    ) -> StoreResult<AchievementRecord>;
    /// Newest first.
    async fn achievement_records(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<AchievementRecord>>;
}

/// Escapes `%`, `_` and `\` for use inside a LIKE pattern.
pub(crate) fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
