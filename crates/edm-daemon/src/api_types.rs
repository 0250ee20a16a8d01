//! Request and response types for the edm-daemon HTTP endpoints.
//!
//! Requests keep enum-valued fields as strings so a bad value becomes a
//! field-level validation error instead of a decode failure. No business
//! logic lives here.

use chrono::{DateTime, Utc};
use edm_gamify::{AchievementDef, EarnedAchievement, Preferences, QuizQuestion, QuizRecord};
use edm_schemas::{
    AchievementRecord, CompletedLesson, CourseSummary, Enrollment, EnrolledCourse, Lesson,
    LessonProgress, PublicUser,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
    pub documentation: &'static str,
    pub status: &'static str,
    pub features: [&'static str; 5],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNotFound {
    pub error: &'static str,
    pub message: String,
    pub available_endpoints: [&'static str; 6],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// /api/auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub learning_style: Option<String>,
    pub grade: Option<String>,
    pub school: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub learning_style: Option<String>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub enrolled_courses: Vec<EnrolledCourse>,
    pub achievements: Vec<AchievementRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: T,
}

// ---------------------------------------------------------------------------
// /api/learning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CourseQuery {
    pub category: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
}

/// Create and update share one body; on create the required fields are
/// checked, on update every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub tags: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub estimated_hours: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: Option<String>,
    pub order: Option<i32>,
    pub duration: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompleteLessonRequest {
    pub time_spent: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub course: CourseRef,
    pub user_progress: Option<LessonProgress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithProgress {
    #[serde(flatten)]
    pub summary: CourseSummary,
    pub completed_lessons: i64,
    /// Whole percent of lessons completed.
    pub progress: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseWithProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub message: &'static str,
    pub enrollment: Enrollment,
    pub new_achievements: Vec<&'static AchievementDef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompleteResponse {
    pub message: &'static str,
    pub progress: LessonProgress,
    pub course_progress: i64,
    pub new_achievements: Vec<&'static AchievementDef>,
    pub current_streak: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseList {
    pub courses: Vec<CourseSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub course: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub lesson: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyCourses {
    pub enrollments: Vec<MyCourse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSnapshot {
    pub points: i64,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_enrollments: i64,
    pub completed_courses: i64,
    pub total_lessons_completed: i64,
    pub completion_rate: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub user: PointsSnapshot,
    pub stats: LearningStats,
    pub recent_achievements: Vec<AchievementRecord>,
    pub recent_activity: Vec<CompletedLesson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEnvelope<T> {
    pub progress: T,
}

// ---------------------------------------------------------------------------
// /api/ai
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplanationRequest {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub learning_style: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionsRequest {
    pub topic: Option<String>,
    pub count: Option<i64>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningPathRequest {
    pub subject: Option<String>,
    pub current_level: Option<String>,
    pub goals: Option<String>,
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitQuizRequest {
    pub topic: Option<String>,
    pub answers: Option<Vec<Value>>,
    pub questions: Option<Vec<QuizQuestion>>,
}

/// Tutor output as returned to the client. A cache hit carries
/// `fromCache: true` and no XP fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Generated<T> {
    #[serde(flatten)]
    pub body: T,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp_earned: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_achievements: Option<Vec<&'static AchievementDef>>,
}

impl<T> Generated<T> {
    pub fn cached(body: T) -> Self {
        Self {
            body,
            from_cache: true,
            xp_earned: None,
            new_achievements: None,
        }
    }

    pub fn fresh(body: T, outcome: edm_gamify::ActivityOutcome) -> Self {
        Self {
            body,
            from_cache: false,
            xp_earned: Some(outcome.xp_earned),
            new_achievements: Some(outcome.new_achievements),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    #[serde(flatten)]
    pub outcome: edm_gamify::QuizOutcome,
    pub feedback: QuizFeedback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizFeedback {
    pub message: String,
    pub xp_earned: u64,
    pub new_achievements: Vec<&'static AchievementDef>,
    pub current_streak: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatBody {
    pub message: Option<String>,
    pub context: Option<Vec<Value>>,
}

// ---------------------------------------------------------------------------
// /api/gamification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedView {
    #[serde(flatten)]
    pub def: &'static AchievementDef,
    pub earned_at: DateTime<Utc>,
}

impl From<&EarnedAchievement> for EarnedView {
    fn from(e: &EarnedAchievement) -> Self {
        Self {
            def: e.id.def(),
            earned_at: e.earned_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsResponse {
    pub earned: Vec<EarnedView>,
    pub available: Vec<&'static AchievementDef>,
    pub total_earned: usize,
    pub total_available: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
    pub progress_to_next_level: f64,
    pub courses_completed: usize,
    pub courses_enrolled: usize,
    pub achievements_unlocked: usize,
    pub learning_streak: u32,
    pub topics_explored: usize,
    pub quizzes_completed: usize,
    /// Minutes, estimated from XP.
    pub total_study_time: u64,
    pub average_quiz_score: u64,
    pub best_streak: u32,
    pub last_active: Option<DateTime<Utc>>,
    pub recent_achievements: Vec<&'static AchievementDef>,
    pub recent_quizzes: Vec<QuizRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_achievements: Vec<&'static AchievementDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwardXpRequest {
    pub amount: Option<i64>,
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardXpResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub reason: String,
    #[serde(flatten)]
    pub award: edm_gamify::XpAward,
}

// ---------------------------------------------------------------------------
// /api/user
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub learning_style: edm_schemas::LearningStyle,
    pub level: u32,
    pub xp: u64,
    pub achievements: usize,
    pub courses_completed: usize,
    pub learning_streak: u32,
    pub preferences: Preferences,
    pub joined_at: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesResponse {
    pub message: &'static str,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodRequest {
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub focus: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoodResponse {
    pub message: &'static str,
    pub recommendation: &'static str,
    pub entry: edm_gamify::MoodEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalCreated {
    pub message: &'static str,
    pub goal: edm_gamify::Goal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesRequest {
    pub learning_style: Option<String>,
    pub notifications: Option<bool>,
    pub accessibility: Option<AccessibilityRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessibilityRequest {
    pub high_contrast: Option<bool>,
    pub font_size: Option<String>,
    pub screen_reader: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub target: Option<i64>,
    pub deadline: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}
