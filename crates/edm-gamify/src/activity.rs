use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::award::settle_milestones;
use crate::catalog::AchievementDef;
use crate::level::level_for_xp;
use crate::progress::{LearningPathEntry, UserProgress};
use crate::streak::record_study_day;

pub const EXPLANATION_XP: u64 = 5;
pub const NEW_TOPIC_BONUS_XP: u64 = 10;
pub const PRACTICE_XP: u64 = 3;
pub const LEARNING_PATH_XP: u64 = 20;

/// Result of any XP-changing action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOutcome {
    /// XP from the action itself, excluding achievement XP.
    pub xp_earned: u64,
    pub new_achievements: Vec<&'static AchievementDef>,
    pub total_xp: u64,
    pub level: u32,
}

fn finish(
    progress: &mut UserProgress,
    xp_earned: u64,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    progress.xp = progress.xp.saturating_add(xp_earned);
    progress.touch(now);
    let new_achievements = settle_milestones(progress, Some(now), now);
    ActivityOutcome {
        xp_earned,
        new_achievements,
        total_xp: progress.xp,
        level: progress.level(),
    }
}

/// A freshly generated (not cached) explanation.
pub fn record_explanation(
    progress: &mut UserProgress,
    topic: &str,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    progress.explanations_generated = progress.explanations_generated.saturating_add(1);
    progress.daily_explanations.bump(now.date_naive());
    let bonus = if progress.explore_topic(topic) {
        NEW_TOPIC_BONUS_XP
    } else {
        0
    };
    finish(progress, EXPLANATION_XP + bonus, now)
}

/// A freshly generated set of practice questions.
pub fn record_practice(
    progress: &mut UserProgress,
    topic: &str,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    progress.practice_sessions = progress.practice_sessions.saturating_add(1);
    progress.explore_topic(topic);
    finish(progress, PRACTICE_XP, now)
}

pub fn record_learning_path(
    progress: &mut UserProgress,
    subject: &str,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    progress.push_learning_path(LearningPathEntry {
        subject: subject.trim().to_string(),
        created_at: now,
    });
    finish(progress, LEARNING_PATH_XP, now)
}

pub fn record_enrollment(
    progress: &mut UserProgress,
    course_id: Uuid,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    if !progress.enrolled_courses.contains(&course_id) {
        progress.enrolled_courses.push(course_id);
    }
    finish(progress, 0, now)
}

/// A lesson completion counts as a study day.
pub fn record_lesson_completion(
    progress: &mut UserProgress,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    record_study_day(progress, now.date_naive());
    finish(progress, 0, now)
}

pub fn record_course_completion(
    progress: &mut UserProgress,
    course_id: Uuid,
    now: DateTime<Utc>,
) -> ActivityOutcome {
    if !progress.completed_courses.contains(&course_id) {
        progress.completed_courses.push(course_id);
    }
    finish(progress, 0, now)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("XP amount must be positive")]
pub struct InvalidXpAmount;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAward {
    pub xp_awarded: u64,
    #[serde(rename = "newXP")]
    pub new_xp: u64,
    pub old_level: u32,
    pub new_level: u32,
    pub leveled_up: bool,
}

/// Manual XP grant. Does not run milestone checks; the next progress view
/// settles them.
pub fn award_xp(
    progress: &mut UserProgress,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<XpAward, InvalidXpAmount> {
    let amount = u64::try_from(amount)
        .ok()
        .filter(|a| *a > 0)
        .ok_or(InvalidXpAmount)?;
    let old_level = level_for_xp(progress.xp);
    progress.xp = progress.xp.saturating_add(amount);
    progress.touch(now);
    let new_level = level_for_xp(progress.xp);
    Ok(XpAward {
        xp_awarded: amount,
        new_xp: progress.xp,
        old_level,
        new_level,
        leveled_up: new_level > old_level,
    })
}
