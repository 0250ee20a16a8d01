use chrono::{DateTime, Timelike, Utc};

use crate::catalog::{AchievementDef, AchievementId};
use crate::progress::{EarnedAchievement, UserProgress};

pub const STREAK_WEEK: u32 = 7;
pub const STREAK_MONTH: u32 = 30;
pub const KNOWLEDGE_SEEKER_EXPLANATIONS: u32 = 50;
pub const QUIZ_MASTER_QUIZZES: usize = 25;
pub const TOPIC_EXPLORER_TOPICS: usize = 20;
/// Activities strictly before this UTC hour count as early.
pub const EARLY_BIRD_BEFORE_HOUR: u32 = 9;
/// Activities at or after this UTC hour count as late.
pub const NIGHT_OWL_FROM_HOUR: u32 = 22;

/// Grants each achievement in `ids` that `progress` does not hold yet and
/// adds its XP. Returns the newly granted definitions in input order.
///
/// Idempotent: an id already held (or repeated in `ids`) is skipped.
pub fn award(
    progress: &mut UserProgress,
    ids: &[AchievementId],
    now: DateTime<Utc>,
) -> Vec<&'static AchievementDef> {
    let mut granted = Vec::new();
    for &id in ids {
        if progress.has(id) {
            continue;
        }
        let def = id.def();
        progress.achievements.push(EarnedAchievement { id, earned_at: now });
        progress.xp = progress.xp.saturating_add(def.xp);
        granted.push(def);
    }
    granted
}

/// Achievements whose conditions `progress` currently satisfies but which
/// are not yet held.
///
/// Time-of-day achievements are only considered when `activity_at` is the
/// moment of a learning activity; passing `None` skips them.
pub fn pending_milestones(
    progress: &UserProgress,
    activity_at: Option<DateTime<Utc>>,
) -> Vec<AchievementId> {
    let level = progress.level();
    let checks = [
        (AchievementId::Welcome, true),
        (
            AchievementId::FirstCourse,
            !progress.enrolled_courses.is_empty(),
        ),
        (
            AchievementId::CourseCompleted,
            !progress.completed_courses.is_empty(),
        ),
        (AchievementId::FirstQuizPassed, progress.passed_quizzes() > 0),
        (
            AchievementId::PerfectScore,
            progress.quiz_history.iter().any(|q| q.score >= 100.0),
        ),
        (
            AchievementId::LearningStreak7,
            progress.best_streak >= STREAK_WEEK,
        ),
        (
            AchievementId::LearningStreak30,
            progress.best_streak >= STREAK_MONTH,
        ),
        (AchievementId::LevelUp5, level >= 5),
        (AchievementId::LevelUp10, level >= 10),
        (
            AchievementId::KnowledgeSeeker,
            progress.explanations_generated >= KNOWLEDGE_SEEKER_EXPLANATIONS,
        ),
        (
            AchievementId::QuizMaster,
            progress.quizzes_taken() >= QUIZ_MASTER_QUIZZES,
        ),
        (
            AchievementId::TopicExplorer,
            progress.topics_explored.len() >= TOPIC_EXPLORER_TOPICS,
        ),
        (
            AchievementId::EarlyBird,
            activity_at.is_some_and(|t| t.hour() < EARLY_BIRD_BEFORE_HOUR),
        ),
        (
            AchievementId::NightOwl,
            activity_at.is_some_and(|t| t.hour() >= NIGHT_OWL_FROM_HOUR),
        ),
    ];

    checks
        .into_iter()
        .filter(|(id, met)| *met && !progress.has(*id))
        .map(|(id, _)| id)
        .collect()
}

/// Awards every satisfied milestone, repeating until nothing new is
/// granted (achievement XP can itself cross a level milestone).
pub fn settle_milestones(
    progress: &mut UserProgress,
    activity_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<&'static AchievementDef> {
    let mut all = Vec::new();
    loop {
        let pending = pending_milestones(progress, activity_at);
        if pending.is_empty() {
            return all;
        }
        all.extend(award(progress, &pending, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn award_is_idempotent() {
        let mut p = UserProgress::default();
        let first = award(
            &mut p,
            &[AchievementId::FirstCourse, AchievementId::FirstCourse],
            noon(),
        );
        assert_eq!(first.len(), 1);
        assert_eq!(p.xp, 25);
        let again = award(&mut p, &[AchievementId::FirstCourse], noon());
        assert!(again.is_empty());
        assert_eq!(p.xp, 25);
        assert_eq!(p.achievements.len(), 1);
    }

    #[test]
    fn settle_grants_welcome_once() {
        let mut p = UserProgress::default();
        let got = settle_milestones(&mut p, None, noon());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, AchievementId::Welcome);
        assert!(settle_milestones(&mut p, None, noon()).is_empty());
    }

    #[test]
    fn settle_reaches_fixed_point_across_levels() {
        // 1500 XP is level 4; the 100 XP of course_completed pushes it to 5.
        let mut p = UserProgress {
            xp: 1_500,
            ..UserProgress::default()
        };
        p.completed_courses.push(uuid::Uuid::new_v4());
        p.achievements.push(EarnedAchievement {
            id: AchievementId::Welcome,
            earned_at: noon(),
        });
        let got = settle_milestones(&mut p, None, noon());
        let ids: Vec<_> = got.iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![AchievementId::CourseCompleted, AchievementId::LevelUp5]
        );
        assert_eq!(p.level(), 5);
    }

    #[test]
    fn time_of_day_only_counts_for_activities() {
        let p = UserProgress::default();
        let early = Utc.with_ymd_and_hms(2024, 5, 6, 7, 30, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 5, 6, 23, 5, 0).unwrap();
        assert!(pending_milestones(&p, Some(early)).contains(&AchievementId::EarlyBird));
        assert!(pending_milestones(&p, Some(late)).contains(&AchievementId::NightOwl));
        let none = pending_milestones(&p, None);
        assert!(!none.contains(&AchievementId::EarlyBird));
        assert!(!none.contains(&AchievementId::NightOwl));
    }
}
