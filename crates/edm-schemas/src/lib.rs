//! Shared domain and wire types for the EduMind backend.
//!
//! Everything here is plain data: `Serialize + Deserialize`, camelCase on
//! the wire, no IO. Enums round-trip through `as_str` / `parse` so the
//! store can keep them as text columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

text_enum!(Role {
    Student => "STUDENT",
    Teacher => "TEACHER",
    Admin => "ADMIN",
});

impl Role {
    /// Teachers and admins may author courses.
    pub fn can_author(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    #[default]
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

text_enum!(LearningStyle {
    Visual => "visual",
    Auditory => "auditory",
    Kinesthetic => "kinesthetic",
    Reading => "reading",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

text_enum!(Difficulty {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LessonType {
    #[default]
    Text,
    Video,
    Interactive,
    Quiz,
}

text_enum!(LessonType {
    Text => "TEXT",
    Video => "VIDEO",
    Interactive => "INTERACTIVE",
    Quiz => "QUIZ",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
}

text_enum!(EnrollmentStatus {
    Active => "ACTIVE",
    Completed => "COMPLETED",
});

/// Category of a persisted achievement record (points ledger entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementKind {
    Engagement,
    LessonStreak,
    CourseCompletion,
}

text_enum!(AchievementKind {
    Engagement => "ENGAGEMENT",
    LessonStreak => "LESSON_STREAK",
    CourseCompletion => "COURSE_COMPLETION",
});

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Full user row. `password_hash` never leaves the process: it is skipped
/// on serialization; use [`User::public`] for responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub learning_style: LearningStyle,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub timezone: Option<String>,
    pub points: i64,
    pub level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
            learning_style: self.learning_style,
            grade: self.grade.clone(),
            school: self.school.clone(),
            timezone: self.timezone.clone(),
            points: self.points,
            level: self.level,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_active: self.last_active,
        }
    }
}

/// User as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub learning_style: LearningStyle,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub timezone: Option<String>,
    pub points: i64,
    pub level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
    pub learning_style: LearningStyle,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub bio: Option<String>,
    pub points: i64,
    pub level: i32,
}

/// Partial update for the self-service profile endpoint. `None` = unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub learning_style: Option<LearningStyle>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub timezone: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.learning_style.is_none()
            && self.grade.is_none()
            && self.school.is_none()
            && self.timezone.is_none()
    }
}

// ---------------------------------------------------------------------------
// Courses and lessons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: Difficulty,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    pub estimated_hours: i32,
    pub is_published: bool,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    pub order: i32,
    /// Minutes.
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short lesson listing embedded in course summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOutline {
    pub id: Uuid,
    pub title: String,
    pub duration: i32,
}

impl From<&Lesson> for LessonOutline {
    fn from(l: &Lesson) -> Self {
        Self {
            id: l.id,
            title: l.title.clone(),
            duration: l.duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorInfo {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

/// Course list entry with the derived stats the catalog page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub creator: Option<CreatorInfo>,
    pub lessons: Vec<LessonOutline>,
    pub total_duration: i32,
    pub enrollment_count: i64,
    pub lesson_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub creator: Option<CreatorInfo>,
    pub lessons: Vec<Lesson>,
    pub enrollment_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub category: Option<String>,
    pub level: Option<Difficulty>,
    pub search: Option<String>,
    pub published_only: bool,
}

impl CourseFilter {
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Self::default()
        }
    }

    /// In-process filter predicate; the SQL store expresses the same rules
    /// in its WHERE clause.
    pub fn matches(&self, c: &Course) -> bool {
        if self.published_only && !c.is_published {
            return false;
        }
        if let Some(cat) = &self.category {
            if &c.category != cat {
                return false;
            }
        }
        if let Some(level) = self.level {
            if c.level != level {
                return false;
            }
        }
        if let Some(q) = self.search.as_deref().filter(|q| !q.is_empty()) {
            let needle = q.to_lowercase();
            let hit = c.title.to_lowercase().contains(&needle)
                || c.description.to_lowercase().contains(&needle)
                || c.tags.iter().any(|t| t == q);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: Difficulty,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    pub estimated_hours: i32,
    pub is_published: bool,
    pub creator_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub estimated_hours: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub title: String,
    pub content: String,
    pub lesson_type: LessonType,
    pub order: i32,
    pub duration: i32,
}

#[derive(Debug, Clone, Default)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub lesson_type: Option<LessonType>,
    pub order: Option<i32>,
    pub duration: Option<i32>,
}

// ---------------------------------------------------------------------------
// Enrollment and progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    /// Percent, 0..=100.
    pub progress: f64,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An enrollment together with its course summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    /// Minutes.
    pub time_spent: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A completed lesson joined with its lesson and course titles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLesson {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub course_title: String,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Achievement records (points ledger)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub points: i32,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAchievementRecord {
    pub user_id: Uuid,
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub points: i32,
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_text() {
        for r in Role::ALL {
            assert_eq!(Role::parse(r.as_str()), Some(*r));
        }
        for s in LearningStyle::ALL {
            assert_eq!(LearningStyle::parse(s.as_str()), Some(*s));
        }
        assert_eq!(AchievementKind::parse("LESSON_STREAK"), Some(AchievementKind::LessonStreak));
        assert_eq!(Difficulty::parse("expert"), None);
    }

    #[test]
    fn serde_names_match_text_names() {
        let v = serde_json::to_value(AchievementKind::CourseCompletion).unwrap();
        assert_eq!(v, "COURSE_COMPLETION");
        let v = serde_json::to_value(LearningStyle::Kinesthetic).unwrap();
        assert_eq!(v, "kinesthetic");
        let v = serde_json::to_value(Role::Teacher).unwrap();
        assert_eq!(v, "TEACHER");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = Utc::now();
        let u = User {
            id: Uuid::new_v4(),
            email: "a@b.io".into(),
            username: "abc".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password_hash: "$2b$10$secret".into(),
            role: Role::Student,
            avatar: None,
            bio: None,
            learning_style: LearningStyle::Visual,
            grade: None,
            school: None,
            timezone: None,
            points: 0,
            level: 1,
            created_at: now,
            updated_at: now,
            last_active: None,
        };
        let s = serde_json::to_string(&u).unwrap();
        assert!(!s.contains("secret"));
        assert!(s.contains("\"firstName\""));
    }

    fn course(title: &str, tags: &[&str], published: bool) -> Course {
        let now = Utc::now();
        Course {
            id: Uuid::new_v4(),
            title: title.into(),
            description: "An introduction".into(),
            category: "Mathematics".into(),
            level: Difficulty::Beginner,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            thumbnail: None,
            estimated_hours: 10,
            is_published: published,
            creator_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn filter_search_is_case_insensitive_on_text_exact_on_tags() {
        let c = course("Algebra Fundamentals", &["equations"], true);
        let mut f = CourseFilter::published();
        f.search = Some("ALGEBRA".into());
        assert!(f.matches(&c));
        f.search = Some("equations".into());
        assert!(f.matches(&c));
        f.search = Some("equation".into());
        assert!(!f.matches(&c));
    }

    #[test]
    fn filter_hides_unpublished() {
        let c = course("Draft", &[], false);
        assert!(!CourseFilter::published().matches(&c));
        assert!(CourseFilter::default().matches(&c));
    }
}
