use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, Timelike, Utc, Weekday};
use edm_schemas::LearningStyle;
use serde::Serialize;

use crate::award::STREAK_MONTH;
use crate::progress::{QuizRecord, UserProgress};
use crate::quiz::PASS_THRESHOLD;

/// Study minutes credited per completed quiz.
pub const MINUTES_PER_QUIZ: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalyticsTimeframe {
    #[serde(rename = "7days")]
    Days7,
    #[serde(rename = "30days")]
    Days30,
    #[serde(rename = "90days")]
    Days90,
}

impl AnalyticsTimeframe {
    /// Unknown values fall back to 30 days.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("7days") => Self::Days7,
            Some("90days") => Self::Days90,
            _ => Self::Days30,
        }
    }

    pub fn days(self) -> u64 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days90 => 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub xp_earned: u64,
    pub quizzes_completed: usize,
    pub time_spent: u64,
    pub topics_studied: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub average_quiz_score: u64,
    pub total_quizzes: usize,
    pub perfect_scores: usize,
    pub improvement_trend: Trend,
    pub strongest_subjects: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPatterns {
    /// morning | afternoon | evening | night; `None` without quizzes.
    pub preferred_learning_time: Option<&'static str>,
    /// Average minutes per active day.
    pub session_duration: u64,
    pub consistency: u32,
    pub peak_performance_days: Vec<String>,
    pub learning_style: LearningStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub description: String,
    pub priority: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub xp_gained: u64,
    pub time_spent: u64,
    pub quizzes_completed: usize,
    pub current_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub timeframe: AnalyticsTimeframe,
    pub summary: AnalyticsSummary,
    pub daily_activity: Vec<DailyActivity>,
    pub performance_metrics: PerformanceMetrics,
    pub learning_patterns: LearningPatterns,
    pub recommendations: Vec<Recommendation>,
}

/// Learning analytics derived only from the stored quiz history.
///
/// `daily_activity` has one entry per calendar day from the start of the
/// timeframe through `now`, inclusive.
pub fn analytics(
    progress: &UserProgress,
    timeframe: AnalyticsTimeframe,
    learning_style: LearningStyle,
    now: DateTime<Utc>,
) -> AnalyticsReport {
    let today = now.date_naive();
    let start = today
        .checked_sub_days(Days::new(timeframe.days()))
        .unwrap_or(today);

    let recent: Vec<&QuizRecord> = progress
        .quiz_history
        .iter()
        .filter(|q| q.completed_at.date_naive() >= start && q.completed_at <= now)
        .collect();

    let daily_activity = daily_activity(&recent, start, today);
    let xp_gained = daily_activity.iter().map(|d| d.xp_earned).sum();
    let time_spent: u64 = daily_activity.iter().map(|d| d.time_spent).sum();
    let active_days = daily_activity.iter().filter(|d| d.quizzes_completed > 0).count() as u64;

    let performance_metrics = performance(&recent);
    let preferred_learning_time = preferred_time(&recent);

    let learning_patterns = LearningPatterns {
        preferred_learning_time,
        session_duration: if active_days == 0 { 0 } else { time_spent / active_days },
        consistency: progress.learning_streak,
        peak_performance_days: peak_days(&recent),
        learning_style,
    };

    let recommendations = recommendations(progress, &performance_metrics, preferred_learning_time);

    AnalyticsReport {
        timeframe,
        summary: AnalyticsSummary {
            total_xp: progress.xp,
            xp_gained,
            time_spent,
            quizzes_completed: recent.len(),
            current_streak: progress.learning_streak,
        },
        daily_activity,
        performance_metrics,
        learning_patterns,
        recommendations,
    }
}

fn daily_activity(recent: &[&QuizRecord], start: NaiveDate, today: NaiveDate) -> Vec<DailyActivity> {
    let mut out = Vec::new();
    let mut day = start;
    while day <= today {
        let quizzes: Vec<&&QuizRecord> = recent
            .iter()
            .filter(|q| q.completed_at.date_naive() == day)
            .collect();
        let mut topics: Vec<&str> = quizzes.iter().map(|q| q.topic.as_str()).collect();
        topics.sort_unstable();
        topics.dedup();
        out.push(DailyActivity {
            date: day,
            xp_earned: quizzes.iter().map(|q| q.xp_earned).sum(),
            quizzes_completed: quizzes.len(),
            time_spent: quizzes.len() as u64 * MINUTES_PER_QUIZ,
            topics_studied: topics.len(),
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

fn mean(scores: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = scores.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn performance(recent: &[&QuizRecord]) -> PerformanceMetrics {
    let average = mean(recent.iter().map(|q| q.score)).unwrap_or(0.0);

    // Second half against first half, in completion order.
    let improvement_trend = if recent.len() < 4 {
        Trend::Stable
    } else {
        let mid = recent.len() / 2;
        let first = mean(recent[..mid].iter().map(|q| q.score)).unwrap_or(0.0);
        let second = mean(recent[mid..].iter().map(|q| q.score)).unwrap_or(0.0);
        if second - first >= 5.0 {
            Trend::Improving
        } else if first - second >= 5.0 {
            Trend::Declining
        } else {
            Trend::Stable
        }
    };

    let mut by_topic: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for q in recent {
        by_topic.entry(q.topic.as_str()).or_default().push(q.score);
    }
    let mut averages: Vec<(&str, f64)> = by_topic
        .into_iter()
        .filter_map(|(t, s)| mean(s.into_iter()).map(|m| (t, m)))
        .collect();
    averages.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let strongest_subjects = averages
        .iter()
        .filter(|(_, m)| *m >= PASS_THRESHOLD)
        .take(3)
        .map(|(t, _)| t.to_string())
        .collect();
    let areas_for_improvement = averages
        .iter()
        .rev()
        .filter(|(_, m)| *m < PASS_THRESHOLD)
        .take(3)
        .map(|(t, _)| t.to_string())
        .collect();

    PerformanceMetrics {
        average_quiz_score: average.round() as u64,
        total_quizzes: recent.len(),
        perfect_scores: recent.iter().filter(|q| q.score >= 100.0).count(),
        improvement_trend,
        strongest_subjects,
        areas_for_improvement,
    }
}

fn time_bucket(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    }
}

/// Most frequent bucket; ties go to the earlier bucket of the day.
fn preferred_time(recent: &[&QuizRecord]) -> Option<&'static str> {
    const ORDER: [&str; 4] = ["morning", "afternoon", "evening", "night"];
    let mut counts = [0usize; 4];
    for q in recent {
        let b = time_bucket(q.completed_at.hour());
        if let Some(i) = ORDER.iter().position(|o| *o == b) {
            counts[i] += 1;
        }
    }
    let (best, n) = counts
        .iter()
        .enumerate()
        .fold((0, 0), |acc, (i, &n)| if n > acc.1 { (i, n) } else { acc });
    (n > 0).then(|| ORDER[best])
}

/// Up to two weekdays with the highest average score.
fn peak_days(recent: &[&QuizRecord]) -> Vec<String> {
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for q in recent {
        by_day
            .entry(q.completed_at.weekday().num_days_from_monday())
            .or_default()
            .push(q.score);
    }
    let mut days: Vec<(u32, f64)> = by_day
        .into_iter()
        .filter_map(|(d, s)| mean(s.into_iter()).map(|m| (d, m)))
        .collect();
    days.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    days.into_iter()
        .take(2)
        .map(|(d, _)| weekday_name(d).to_string())
        .collect()
}

fn weekday_name(days_from_monday: u32) -> &'static str {
    const NAMES: [(Weekday, &str); 7] = [
        (Weekday::Mon, "Monday"),
        (Weekday::Tue, "Tuesday"),
        (Weekday::Wed, "Wednesday"),
        (Weekday::Thu, "Thursday"),
        (Weekday::Fri, "Friday"),
        (Weekday::Sat, "Saturday"),
        (Weekday::Sun, "Sunday"),
    ];
    NAMES
        .iter()
        .find(|(w, _)| w.num_days_from_monday() == days_from_monday)
        .map(|(_, n)| *n)
        .unwrap_or("Monday")
}

fn recommendations(
    progress: &UserProgress,
    perf: &PerformanceMetrics,
    preferred: Option<&'static str>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if progress.learning_streak < STREAK_MONTH {
        out.push(Recommendation {
            kind: "streak",
            title: "Maintain Learning Streak".to_string(),
            description: format!(
                "Keep up your daily learning habit to reach a {STREAK_MONTH}-day streak"
            ),
            priority: "high",
        });
    }
    if let Some(weak) = perf.areas_for_improvement.first() {
        out.push(Recommendation {
            kind: "weak_area",
            title: format!("Focus on {weak}"),
            description: format!(
                "Your quiz scores in {weak} are below average. Consider taking focused courses."
            ),
            priority: "medium",
        });
    }
    if let Some(when) = preferred {
        out.push(Recommendation {
            kind: "time_optimization",
            title: "Optimal Study Time".to_string(),
            description: format!(
                "You study most in the {when}. Schedule challenging topics during this time."
            ),
            priority: "low",
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn quiz(topic: &str, score: f64, at: DateTime<Utc>) -> QuizRecord {
        QuizRecord {
            topic: topic.into(),
            score,
            total_questions: 4,
            correct_answers: (score / 25.0) as u32,
            passed: score >= PASS_THRESHOLD,
            xp_earned: 10,
            completed_at: at,
        }
    }

    // Wednesday afternoon.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn timeframe_parse_defaults_to_thirty_days() {
        assert_eq!(AnalyticsTimeframe::parse(None), AnalyticsTimeframe::Days30);
        assert_eq!(AnalyticsTimeframe::parse(Some("bogus")), AnalyticsTimeframe::Days30);
        assert_eq!(AnalyticsTimeframe::parse(Some("7days")).days(), 7);
    }

    #[test]
    fn empty_history_is_all_zeroes() {
        let r = analytics(
            &UserProgress::default(),
            AnalyticsTimeframe::Days7,
            LearningStyle::Visual,
            now(),
        );
        assert_eq!(r.daily_activity.len(), 8);
        assert_eq!(r.summary.xp_gained, 0);
        assert_eq!(r.performance_metrics.average_quiz_score, 0);
        assert_eq!(r.performance_metrics.improvement_trend, Trend::Stable);
        assert_eq!(r.learning_patterns.preferred_learning_time, None);
        assert_eq!(r.learning_patterns.session_duration, 0);
        assert_eq!(r.recommendations.len(), 1);
    }

    #[test]
    fn metrics_follow_quiz_history() {
        let n = now();
        let mut p = UserProgress::default();
        p.quiz_history = vec![
            quiz("Old", 10.0, n - Duration::days(40)),
            quiz("Algebra", 50.0, n - Duration::days(3)),
            quiz("Algebra", 50.0, n - Duration::days(2)),
            quiz("Biology", 100.0, n - Duration::days(1)),
            quiz("Biology", 100.0, n),
        ];
        let r = analytics(&p, AnalyticsTimeframe::Days30, LearningStyle::Reading, n);

        assert_eq!(r.summary.quizzes_completed, 4);
        assert_eq!(r.summary.xp_gained, 40);
        assert_eq!(r.summary.time_spent, 60);
        assert_eq!(r.performance_metrics.average_quiz_score, 75);
        assert_eq!(r.performance_metrics.perfect_scores, 2);
        assert_eq!(r.performance_metrics.improvement_trend, Trend::Improving);
        assert_eq!(r.performance_metrics.strongest_subjects, vec!["Biology"]);
        assert_eq!(r.performance_metrics.areas_for_improvement, vec!["Algebra"]);
        assert_eq!(r.learning_patterns.preferred_learning_time, Some("afternoon"));
        assert_eq!(r.learning_patterns.session_duration, 15);
        assert_eq!(r.daily_activity.last().unwrap().quizzes_completed, 1);
        assert!(r.recommendations.iter().any(|x| x.title == "Focus on Algebra"));
    }

    #[test]
    fn serializes_timeframe_and_total_xp_names() {
        let r = analytics(
            &UserProgress::default(),
            AnalyticsTimeframe::Days90,
            LearningStyle::Visual,
            now(),
        );
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["timeframe"], "90days");
        assert!(v["summary"].get("totalXP").is_some());
        assert_eq!(v["dailyActivity"][0]["date"], "2024-02-15");
    }
}
