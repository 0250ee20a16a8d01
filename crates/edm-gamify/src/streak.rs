use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::progress::UserProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakChange {
    /// First study day, or the previous streak lapsed.
    Started,
    /// Studied yesterday as well.
    Extended,
    /// Already studied today.
    Unchanged,
}

/// Updates the study streak for activity on `today`.
///
/// Yesterday extends the streak, today leaves it alone, anything else
/// (including a `today` earlier than the last study date) restarts at 1.
pub fn record_study_day(progress: &mut UserProgress, today: NaiveDate) -> StreakChange {
    let yesterday = today.checked_sub_days(Days::new(1));
    let change = match progress.last_study_date {
        Some(last) if last == today => StreakChange::Unchanged,
        Some(last) if Some(last) == yesterday => {
            progress.learning_streak = progress.learning_streak.saturating_add(1);
            StreakChange::Extended
        }
        _ => {
            progress.learning_streak = 1;
            StreakChange::Started
        }
    };
    if change != StreakChange::Unchanged {
        progress.last_study_date = Some(today);
    }
    progress.best_streak = progress.best_streak.max(progress.learning_streak);
    change
}

/// Streak as seen on `today`: zero once a full day has been missed.
pub fn current_streak(progress: &UserProgress, today: NaiveDate) -> u32 {
    let Some(last) = progress.last_study_date else {
        return 0;
    };
    let yesterday = today.checked_sub_days(Days::new(1));
    if last == today || Some(last) == yesterday {
        progress.learning_streak
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn consecutive_days_extend() {
        let mut p = UserProgress::default();
        assert_eq!(record_study_day(&mut p, d(1)), StreakChange::Started);
        assert_eq!(record_study_day(&mut p, d(2)), StreakChange::Extended);
        assert_eq!(record_study_day(&mut p, d(3)), StreakChange::Extended);
        assert_eq!(p.learning_streak, 3);
        assert_eq!(p.best_streak, 3);
    }

    #[test]
    fn same_day_is_unchanged() {
        let mut p = UserProgress::default();
        record_study_day(&mut p, d(1));
        assert_eq!(record_study_day(&mut p, d(1)), StreakChange::Unchanged);
        assert_eq!(p.learning_streak, 1);
    }

    #[test]
    fn gap_restarts_but_keeps_best() {
        let mut p = UserProgress::default();
        record_study_day(&mut p, d(1));
        record_study_day(&mut p, d(2));
        assert_eq!(record_study_day(&mut p, d(5)), StreakChange::Started);
        assert_eq!(p.learning_streak, 1);
        assert_eq!(p.best_streak, 2);
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let mut p = UserProgress::default();
        record_study_day(&mut p, d(31));
        let feb1 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(record_study_day(&mut p, feb1), StreakChange::Extended);
    }

    #[test]
    fn current_streak_lapses_after_missed_day() {
        let mut p = UserProgress::default();
        record_study_day(&mut p, d(1));
        record_study_day(&mut p, d(2));
        assert_eq!(current_streak(&p, d(3)), 2);
        assert_eq!(current_streak(&p, d(4)), 0);
    }
}
