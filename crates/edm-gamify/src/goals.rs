use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::UserProgress;

pub const GOAL_TITLE_MIN: usize = 3;
pub const GOAL_TITLE_MAX: usize = 100;
/// Number of latest quizzes averaged for a `quiz_score` goal.
pub const QUIZ_SCORE_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Xp,
    Courses,
    Streak,
    QuizScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GoalKind,
    pub target: u64,
    pub current: u64,
    pub deadline: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub status: GoalStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    #[serde(rename = "type")]
    pub kind: GoalKind,
    pub target: u64,
    pub deadline: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GoalError {
    #[error("target must be at least 1")]
    TargetTooSmall,
    #[error("title must be 3 to 100 characters")]
    TitleLength,
}

impl NewGoal {
    pub fn validate(&self) -> Result<(), GoalError> {
        if self.target < 1 {
            return Err(GoalError::TargetTooSmall);
        }
        let len = self.title.trim().chars().count();
        if !(GOAL_TITLE_MIN..=GOAL_TITLE_MAX).contains(&len) {
            return Err(GoalError::TitleLength);
        }
        Ok(())
    }
}

/// Validates and appends a goal; ids are unique within one document.
pub fn add_goal(
    progress: &mut UserProgress,
    new: NewGoal,
    now: DateTime<Utc>,
) -> Result<Goal, GoalError> {
    new.validate()?;
    let goal = Goal {
        id: format!("goal_{}_{}", now.timestamp_millis(), progress.goals.len()),
        kind: new.kind,
        target: new.target,
        current: 0,
        deadline: new.deadline,
        title: new.title.trim().to_string(),
        description: new.description.unwrap_or_default(),
        created_at: now,
        status: GoalStatus::Active,
    };
    progress.goals.push(goal.clone());
    Ok(goal)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedGoal {
    #[serde(flatten)]
    pub goal: Goal,
    /// Percent of target reached, capped at 100.
    pub progress: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalSummary {
    pub active: usize,
    pub completed: usize,
    pub expired: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalReport {
    pub goals: Vec<EvaluatedGoal>,
    pub summary: GoalSummary,
}

pub fn goal_current(progress: &UserProgress, kind: GoalKind) -> u64 {
    match kind {
        GoalKind::Xp => progress.xp,
        GoalKind::Courses => progress.completed_courses.len() as u64,
        GoalKind::Streak => u64::from(progress.learning_streak),
        GoalKind::QuizScore => recent_average_score(progress, QUIZ_SCORE_WINDOW)
            .map(|s| s.round() as u64)
            .unwrap_or(0),
    }
}

pub(crate) fn recent_average_score(progress: &UserProgress, window: usize) -> Option<f64> {
    let n = progress.quiz_history.len();
    let recent = &progress.quiz_history[n.saturating_sub(window)..];
    if recent.is_empty() {
        return None;
    }
    Some(recent.iter().map(|q| q.score).sum::<f64>() / recent.len() as f64)
}

/// Re-evaluates every goal against the current progress.
///
/// Status precedence: completed, then expired, then active.
pub fn evaluate_goals(progress: &UserProgress, now: DateTime<Utc>) -> GoalReport {
    let mut summary = GoalSummary::default();
    let goals = progress
        .goals
        .iter()
        .map(|g| {
            let current = goal_current(progress, g.kind);
            let pct = if g.target == 0 {
                100
            } else {
                (current.min(g.target) * 100 / g.target) as u32
            };
            let status = if current >= g.target {
                GoalStatus::Completed
            } else if now > g.deadline {
                GoalStatus::Expired
            } else {
                GoalStatus::Active
            };
            match status {
                GoalStatus::Active => summary.active += 1,
                GoalStatus::Completed => summary.completed += 1,
                GoalStatus::Expired => summary.expired += 1,
            }
            EvaluatedGoal {
                goal: Goal {
                    current,
                    status,
                    ..g.clone()
                },
                progress: pct,
            }
        })
        .collect();
    GoalReport { goals, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn new_goal(kind: GoalKind, target: u64, deadline: DateTime<Utc>) -> NewGoal {
        NewGoal {
            kind,
            target,
            deadline,
            title: "Reach the goal".into(),
            description: None,
        }
    }

    #[test]
    fn validation_rejects_short_titles_and_zero_targets() {
        let mut g = new_goal(GoalKind::Xp, 0, now());
        assert_eq!(g.validate(), Err(GoalError::TargetTooSmall));
        g.target = 1;
        g.title = " ab ".into();
        assert_eq!(g.validate(), Err(GoalError::TitleLength));
        g.title = "x".repeat(101);
        assert_eq!(g.validate(), Err(GoalError::TitleLength));
    }

    #[test]
    fn status_precedence_completed_over_expired() {
        let mut p = UserProgress {
            xp: 500,
            ..UserProgress::default()
        };
        let past = now() - Duration::days(1);
        let future = now() + Duration::days(1);
        add_goal(&mut p, new_goal(GoalKind::Xp, 400, past), now()).unwrap();
        add_goal(&mut p, new_goal(GoalKind::Xp, 1_000, past), now()).unwrap();
        add_goal(&mut p, new_goal(GoalKind::Xp, 1_000, future), now()).unwrap();

        let report = evaluate_goals(&p, now());
        let statuses: Vec<_> = report.goals.iter().map(|g| g.goal.status).collect();
        assert_eq!(
            statuses,
            vec![GoalStatus::Completed, GoalStatus::Expired, GoalStatus::Active]
        );
        assert_eq!(report.goals[0].progress, 100);
        assert_eq!(report.goals[1].progress, 50);
        assert_eq!(report.summary.completed, 1);
        assert_eq!(report.summary.expired, 1);
        assert_eq!(report.summary.active, 1);
    }

    #[test]
    fn goal_ids_are_unique_within_a_document() {
        let mut p = UserProgress::default();
        let a = add_goal(&mut p, new_goal(GoalKind::Streak, 3, now()), now()).unwrap();
        let b = add_goal(&mut p, new_goal(GoalKind::Streak, 3, now()), now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn evaluated_goal_flattens_on_the_wire() {
        let mut p = UserProgress::default();
        add_goal(&mut p, new_goal(GoalKind::QuizScore, 80, now()), now()).unwrap();
        let v = serde_json::to_value(&evaluate_goals(&p, now()).goals[0]).unwrap();
        assert_eq!(v["type"], "quiz_score");
        assert_eq!(v["progress"], 0);
        assert_eq!(v["status"], "active");
    }
}
