use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::progress::UserProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeWindow {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub target: u32,
    /// Current count, capped at `target`.
    pub progress: u32,
    pub xp_reward: u32,
    #[serde(rename = "type")]
    pub window: ChallengeWindow,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshTime {
    pub daily: DateTime<Utc>,
    pub weekly: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeBoard {
    pub daily: Vec<Challenge>,
    pub weekly: Vec<Challenge>,
    pub refresh_time: RefreshTime,
}

pub fn challenges(progress: &UserProgress, now: DateTime<Utc>) -> ChallengeBoard {
    let today = now.date_naive();
    let daily_at = now + Duration::days(1);
    let weekly_at = now + Duration::days(7);

    let quizzes_today = progress
        .quiz_history
        .iter()
        .filter(|q| q.completed_at.date_naive() == today)
        .count();
    let quizzes_today = u32::try_from(quizzes_today).unwrap_or(u32::MAX);
    let courses = u32::try_from(progress.enrolled_courses.len()).unwrap_or(u32::MAX);

    let make = |id, title, description, target: u32, count: u32, xp_reward, window, expires_at| {
        Challenge {
            id,
            title,
            description,
            target,
            progress: count.min(target),
            xp_reward,
            window,
            expires_at,
        }
    };

    ChallengeBoard {
        daily: vec![
            make(
                "daily_quiz",
                "Daily Quiz Challenge",
                "Complete 3 practice quizzes",
                3,
                quizzes_today,
                50,
                ChallengeWindow::Daily,
                daily_at,
            ),
            make(
                "daily_learning",
                "Knowledge Seeker",
                "Generate 5 AI explanations",
                5,
                progress.daily_explanations.on(today),
                30,
                ChallengeWindow::Daily,
                daily_at,
            ),
        ],
        weekly: vec![
            make(
                "weekly_streak",
                "Streak Master",
                "Maintain a 7-day learning streak",
                7,
                progress.learning_streak,
                150,
                ChallengeWindow::Weekly,
                weekly_at,
            ),
            make(
                "weekly_courses",
                "Course Explorer",
                "Enroll in 2 new courses",
                2,
                courses,
                100,
                ChallengeWindow::Weekly,
                weekly_at,
            ),
        ],
        refresh_time: RefreshTime {
            daily: daily_at,
            weekly: weekly_at,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::QuizRecord;
    use chrono::TimeZone;

    #[test]
    fn only_todays_quizzes_count_and_progress_is_capped() {
        let now = Utc.with_ymd_and_hms(2024, 4, 10, 15, 0, 0).unwrap();
        let rec = |at: DateTime<Utc>| QuizRecord {
            topic: "t".into(),
            score: 50.0,
            total_questions: 2,
            correct_answers: 1,
            passed: false,
            xp_earned: 4,
            completed_at: at,
        };
        let mut p = UserProgress::default();
        p.quiz_history.push(rec(now - Duration::days(1)));
        for _ in 0..4 {
            p.quiz_history.push(rec(now));
        }
        p.learning_streak = 2;

        let board = challenges(&p, now);
        assert_eq!(board.daily[0].id, "daily_quiz");
        assert_eq!(board.daily[0].progress, 3);
        assert_eq!(board.daily[1].progress, 0);
        assert_eq!(board.weekly[0].progress, 2);
        assert_eq!(board.refresh_time.weekly, now + Duration::days(7));
    }
}
