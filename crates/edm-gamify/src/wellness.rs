use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::UserProgress;

/// Mood log length kept per user.
pub const MOOD_HISTORY_LIMIT: usize = 30;
/// Entries considered for insights.
pub const MOOD_INSIGHT_WINDOW: usize = 7;
pub const MOOD_NOTES_MAX: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Stressed,
    Overwhelmed,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Great => "great",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Stressed => "stressed",
            Mood::Overwhelmed => "overwhelmed",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Mood::Stressed | Mood::Overwhelmed => {
                "Consider taking a 5-minute break before studying. Try some deep breathing exercises."
            }
            Mood::Okay => {
                "You might benefit from starting with an easier topic to build confidence."
            }
            Mood::Great | Mood::Good => {
                "Great mindset for learning! This is a perfect time to tackle challenging topics."
            }
        }
    }

    fn is_positive(self) -> bool {
        matches!(self, Mood::Great | Mood::Good)
    }

    fn is_strained(self) -> bool {
        matches!(self, Mood::Stressed | Mood::Overwhelmed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Energy {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub date: DateTime<Utc>,
    pub mood: Mood,
    pub energy: Energy,
    pub focus: Focus,
    pub notes: String,
    pub session_start: bool,
}

/// Appends a mood entry, keeping only the latest [`MOOD_HISTORY_LIMIT`].
pub fn record_mood(
    progress: &mut UserProgress,
    mood: Mood,
    energy: Energy,
    focus: Focus,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> MoodEntry {
    let entry = MoodEntry {
        date: now,
        mood,
        energy,
        focus,
        notes: notes.map(|n| n.trim().to_string()).unwrap_or_default(),
        session_start: true,
    };
    progress.mood_tracking.push(entry.clone());
    let excess = progress
        .mood_tracking
        .len()
        .saturating_sub(MOOD_HISTORY_LIMIT);
    progress.mood_tracking.drain(..excess);
    entry
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessTrends {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_mood: Option<Mood>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mood_distribution: BTreeMap<&'static str, usize>,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_entries: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessReport {
    pub insights: Vec<Insight>,
    pub trends: WellnessTrends,
    pub recommendations: Vec<String>,
    pub recent_entries: Vec<MoodEntry>,
}

/// Insights over the latest [`MOOD_INSIGHT_WINDOW`] entries.
///
/// The dominant mood is the most frequent one; ties go to the mood that
/// appears first in the window.
pub fn wellness_report(progress: &UserProgress) -> WellnessReport {
    let all = &progress.mood_tracking;
    if all.is_empty() {
        return WellnessReport {
            insights: Vec::new(),
            trends: WellnessTrends::default(),
            recommendations: vec![
                "Start tracking your mood to get personalized wellness insights".to_string(),
            ],
            recent_entries: Vec::new(),
        };
    }

    let recent = &all[all.len().saturating_sub(MOOD_INSIGHT_WINDOW)..];
    let mut counts: Vec<(Mood, usize)> = Vec::new();
    for e in recent {
        match counts.iter_mut().find(|(m, _)| *m == e.mood) {
            Some((_, n)) => *n += 1,
            None => counts.push((e.mood, 1)),
        }
    }
    // First maximum in first-occurrence order.
    let (dominant, dominant_n) = counts
        .iter()
        .copied()
        .fold((recent[0].mood, 0), |best, cur| if cur.1 > best.1 { cur } else { best });
    let pct = (dominant_n as f64 / recent.len() as f64 * 100.0).round();

    let insights = vec![Insight {
        kind: "mood_trend",
        title: format!("Your most common mood this week: {}", dominant.as_str()),
        description: format!(
            "You've felt {} in {pct}% of your recent sessions.",
            dominant.as_str()
        ),
    }];

    let mut recommendations = Vec::new();
    if counts.iter().any(|(m, _)| m.is_strained()) {
        recommendations.push("Consider scheduling regular breaks during study sessions".to_string());
        recommendations
            .push("Try meditation or mindfulness exercises before studying".to_string());
    }
    if dominant.is_positive() {
        recommendations
            .push("Your positive mood is great for learning! Keep up the good habits".to_string());
    }

    WellnessReport {
        insights,
        trends: WellnessTrends {
            dominant_mood: Some(dominant),
            mood_distribution: counts.iter().map(|(m, n)| (m.as_str(), *n)).collect(),
            total_entries: all.len(),
        },
        recommendations,
        recent_entries: recent[recent.len().saturating_sub(3)..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn log(p: &mut UserProgress, moods: &[Mood]) {
        let start = Utc::now();
        for (i, m) in moods.iter().enumerate() {
            record_mood(
                p,
                *m,
                Energy::default(),
                Focus::default(),
                None,
                start + Duration::minutes(i as i64),
            );
        }
    }

    #[test]
    fn history_is_capped() {
        let mut p = UserProgress::default();
        log(&mut p, &[Mood::Good; 35]);
        assert_eq!(p.mood_tracking.len(), MOOD_HISTORY_LIMIT);
    }

    #[test]
    fn empty_log_has_starter_recommendation() {
        let r = wellness_report(&UserProgress::default());
        assert!(r.insights.is_empty());
        assert_eq!(r.recommendations.len(), 1);
        assert_eq!(serde_json::to_value(&r.trends).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn dominant_tie_goes_to_first_seen() {
        let mut p = UserProgress::default();
        log(&mut p, &[Mood::Stressed, Mood::Great, Mood::Great, Mood::Stressed]);
        let r = wellness_report(&p);
        assert_eq!(r.trends.dominant_mood, Some(Mood::Stressed));
        assert_eq!(r.recommendations.len(), 2);
        assert_eq!(r.recent_entries.len(), 3);
        assert!(r.insights[0].description.contains("50%"));
    }

    #[test]
    fn only_last_seven_entries_count() {
        let mut p = UserProgress::default();
        log(&mut p, &[Mood::Overwhelmed; 5]);
        log(&mut p, &[Mood::Great; 7]);
        let r = wellness_report(&p);
        assert_eq!(r.trends.dominant_mood, Some(Mood::Great));
        assert_eq!(r.trends.total_entries, 12);
        assert_eq!(
            r.recommendations,
            vec!["Your positive mood is great for learning! Keep up the good habits".to_string()]
        );
    }
}
