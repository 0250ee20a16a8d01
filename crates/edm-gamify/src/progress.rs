use chrono::{DateTime, NaiveDate, Utc};
use edm_schemas::LearningStyle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::AchievementId;
use crate::goals::Goal;
use crate::level::level_for_xp;
use crate::wellness::MoodEntry;

/// Quiz records kept in the document; lifetime figures live in
/// [`QuizTotals`].
pub const QUIZ_HISTORY_LIMIT: usize = 100;
pub const LEARNING_PATH_LIMIT: usize = 20;

/// Per-user gamification document.
///
/// Stored as one JSON value in the progress cache. Unknown or missing fields
/// fall back to defaults so older documents keep deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    pub xp: u64,
    pub achievements: Vec<EarnedAchievement>,
    pub enrolled_courses: Vec<Uuid>,
    pub completed_courses: Vec<Uuid>,
    /// Normalized topic keys, unique, in first-seen order.
    pub topics_explored: Vec<String>,
    pub explanations_generated: u32,
    pub practice_sessions: u32,
    pub learning_paths: Vec<LearningPathEntry>,
    pub quiz_history: Vec<QuizRecord>,
    pub quiz_totals: QuizTotals,
    pub learning_streak: u32,
    pub best_streak: u32,
    pub last_study_date: Option<NaiveDate>,
    pub last_activity: Option<DateTime<Utc>>,
    pub daily_explanations: DailyCounter,
    pub goals: Vec<Goal>,
    pub mood_tracking: Vec<MoodEntry>,
    pub preferences: Option<Preferences>,
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedAchievement {
    pub id: AchievementId,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathEntry {
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub topic: String,
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub passed: bool,
    pub xp_earned: u64,
    pub completed_at: DateTime<Utc>,
}

/// Lifetime quiz counters, unaffected by history trimming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizTotals {
    pub taken: u32,
    pub passed: u32,
    pub score_sum: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessibility {
    pub high_contrast: bool,
    pub font_size: FontSize,
    pub screen_reader: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub learning_style: LearningStyle,
    pub notifications: bool,
    pub accessibility: Accessibility,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Preferences {
    pub fn defaults_for(learning_style: LearningStyle) -> Self {
        Self {
            learning_style,
            notifications: true,
            accessibility: Accessibility::default(),
            updated_at: None,
        }
    }
}

/// Partial preference update; absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub learning_style: Option<LearningStyle>,
    pub notifications: Option<bool>,
    pub accessibility: Option<AccessibilityPatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityPatch {
    pub high_contrast: Option<bool>,
    pub font_size: Option<FontSize>,
    pub screen_reader: Option<bool>,
}

impl Preferences {
    pub fn apply(&mut self, patch: PreferencesPatch, now: DateTime<Utc>) {
        if let Some(s) = patch.learning_style {
            self.learning_style = s;
        }
        if let Some(n) = patch.notifications {
            self.notifications = n;
        }
        if let Some(a) = patch.accessibility {
            if let Some(v) = a.high_contrast {
                self.accessibility.high_contrast = v;
            }
            if let Some(v) = a.font_size {
                self.accessibility.font_size = v;
            }
            if let Some(v) = a.screen_reader {
                self.accessibility.screen_reader = v;
            }
        }
        self.updated_at = Some(now);
    }
}

/// Count of events on a single calendar day; resets when the day changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCounter {
    pub date: Option<NaiveDate>,
    pub count: u32,
}

impl DailyCounter {
    pub fn bump(&mut self, today: NaiveDate) {
        if self.date == Some(today) {
            self.count += 1;
        } else {
            self.date = Some(today);
            self.count = 1;
        }
    }

    pub fn on(&self, today: NaiveDate) -> u32 {
        if self.date == Some(today) {
            self.count
        } else {
            0
        }
    }
}

impl UserProgress {
    /// Fresh document for a user seen for the first time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            joined_at: Some(now),
            last_activity: Some(now),
            ..Self::default()
        }
    }

    pub fn level(&self) -> u32 {
        level_for_xp(self.xp)
    }

    pub fn has(&self, id: AchievementId) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
    }

    /// Documents written before the totals existed fall back to the history.
    pub fn quizzes_taken(&self) -> usize {
        (self.quiz_totals.taken as usize).max(self.quiz_history.len())
    }

    pub fn passed_quizzes(&self) -> usize {
        let in_history = self.quiz_history.iter().filter(|q| q.passed).count();
        (self.quiz_totals.passed as usize).max(in_history)
    }

    /// Mean score over every quiz taken, 0 when there are none.
    pub fn average_quiz_score(&self) -> f64 {
        if self.quiz_totals.taken > 0 {
            return self.quiz_totals.score_sum / f64::from(self.quiz_totals.taken);
        }
        if self.quiz_history.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.quiz_history.iter().map(|q| q.score).sum();
        sum / self.quiz_history.len() as f64
    }

    /// Appends to the quiz history, dropping the oldest records past
    /// [`QUIZ_HISTORY_LIMIT`].
    pub fn push_quiz(&mut self, record: QuizRecord) {
        self.quiz_totals.taken = self.quiz_totals.taken.saturating_add(1);
        if record.passed {
            self.quiz_totals.passed = self.quiz_totals.passed.saturating_add(1);
        }
        self.quiz_totals.score_sum += record.score;
        self.quiz_history.push(record);
        let excess = self.quiz_history.len().saturating_sub(QUIZ_HISTORY_LIMIT);
        self.quiz_history.drain(..excess);
    }

    pub fn push_learning_path(&mut self, entry: LearningPathEntry) {
        self.learning_paths.push(entry);
        let excess = self.learning_paths.len().saturating_sub(LEARNING_PATH_LIMIT);
        self.learning_paths.drain(..excess);
    }

    /// Records a topic; returns true if it was not seen before.
    pub fn explore_topic(&mut self, topic: &str) -> bool {
        let key = normalize_topic(topic);
        if key.is_empty() || self.topics_explored.contains(&key) {
            return false;
        }
        self.topics_explored.push(key);
        true
    }
}

/// Lowercased, whitespace-collapsed form used to compare topics.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_deduplicated_after_normalization() {
        let mut p = UserProgress::default();
        assert!(p.explore_topic("Linear  Algebra"));
        assert!(!p.explore_topic("linear algebra"));
        assert!(!p.explore_topic("   "));
        assert_eq!(p.topics_explored, vec!["linear algebra".to_string()]);
    }

    #[test]
    fn old_documents_deserialize_with_defaults() {
        let p: UserProgress = serde_json::from_str(r#"{"xp": 120}"#).unwrap();
        assert_eq!(p.xp, 120);
        assert_eq!(p.level(), 2);
        assert!(p.achievements.is_empty());
    }

    #[test]
    fn preference_patch_keeps_untouched_fields() {
        let mut prefs = Preferences::defaults_for(LearningStyle::Auditory);
        let patch: PreferencesPatch =
            serde_json::from_str(r#"{"accessibility": {"fontSize": "large"}}"#).unwrap();
        let now = chrono::Utc::now();
        prefs.apply(patch, now);
        assert_eq!(prefs.learning_style, LearningStyle::Auditory);
        assert!(prefs.notifications);
        assert_eq!(prefs.accessibility.font_size, FontSize::Large);
        assert!(!prefs.accessibility.high_contrast);
        assert_eq!(prefs.updated_at, Some(now));
    }

    fn quiz(score: f64, passed: bool) -> QuizRecord {
        QuizRecord {
            topic: "algebra".into(),
            score,
            total_questions: 4,
            correct_answers: 0,
            passed,
            xp_earned: 8,
            completed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn quiz_history_is_trimmed_but_totals_are_kept() {
        let mut p = UserProgress::default();
        for i in 0..(QUIZ_HISTORY_LIMIT + 30) {
            p.push_quiz(quiz(if i % 2 == 0 { 100.0 } else { 50.0 }, i % 2 == 0));
        }
        assert_eq!(p.quiz_history.len(), QUIZ_HISTORY_LIMIT);
        assert_eq!(p.quizzes_taken(), QUIZ_HISTORY_LIMIT + 30);
        assert_eq!(p.passed_quizzes(), (QUIZ_HISTORY_LIMIT + 30) / 2);
        assert_eq!(p.average_quiz_score(), 75.0);
    }

    #[test]
    fn documents_without_totals_count_their_history() {
        let p = UserProgress {
            quiz_history: vec![quiz(80.0, true), quiz(40.0, false)],
            ..UserProgress::default()
        };
        assert_eq!(p.quizzes_taken(), 2);
        assert_eq!(p.passed_quizzes(), 1);
        assert_eq!(p.average_quiz_score(), 60.0);
        assert_eq!(UserProgress::default().average_quiz_score(), 0.0);
    }

    #[test]
    fn learning_paths_keep_the_newest() {
        let mut p = UserProgress::default();
        for i in 0..(LEARNING_PATH_LIMIT + 5) {
            p.push_learning_path(LearningPathEntry {
                subject: format!("subject {i}"),
                created_at: chrono::Utc::now(),
            });
        }
        assert_eq!(p.learning_paths.len(), LEARNING_PATH_LIMIT);
        assert_eq!(p.learning_paths[0].subject, "subject 5");
    }

    #[test]
    fn daily_counter_resets_on_new_day() {
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let mut c = DailyCounter::default();
        c.bump(d1);
        c.bump(d1);
        assert_eq!(c.on(d1), 2);
        assert_eq!(c.on(d2), 0);
        c.bump(d2);
        assert_eq!(c.on(d2), 1);
    }
}
