use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::award::settle_milestones;
use crate::catalog::AchievementDef;
use crate::progress::{QuizRecord, UserProgress};
use crate::streak::record_study_day;

/// Minimum score (percent) that counts as a pass.
pub const PASS_THRESHOLD: f64 = 70.0;
pub const XP_PER_QUESTION: u64 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,
}

/// A question as submitted back by the client; only the answer key and
/// the explanation matter for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Value,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_index: usize,
    pub user_answer: Value,
    pub correct_answer: Value,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: f64,
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
    pub base_xp: u64,
    pub bonus_xp: u64,
}

impl QuizOutcome {
    pub fn xp_earned(&self) -> u64 {
        self.base_xp + self.bonus_xp
    }
}

/// Scores `answers` against `questions` by position.
///
/// A missing answer is wrong; answers past the last question are ignored.
pub fn score_quiz(questions: &[QuizQuestion], answers: &[Value]) -> Result<QuizOutcome, QuizError> {
    if questions.is_empty() {
        return Err(QuizError::NoQuestions);
    }

    let mut correct = 0u32;
    let results: Vec<QuestionResult> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let user_answer = answers.get(i).cloned().unwrap_or(Value::Null);
            let is_correct = answers_match(&user_answer, &q.correct_answer);
            if is_correct {
                correct += 1;
            }
            QuestionResult {
                question_index: i,
                user_answer,
                correct_answer: q.correct_answer.clone(),
                is_correct,
                explanation: q
                    .explanation
                    .clone()
                    .unwrap_or_else(|| "No explanation available".to_string()),
            }
        })
        .collect();

    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let score = f64::from(correct) / f64::from(total) * 100.0;
    let passed = score >= PASS_THRESHOLD;
    let base_xp = u64::from(total) * XP_PER_QUESTION;
    let bonus_xp = if passed { (score / 10.0).floor() as u64 } else { 0 };

    Ok(QuizOutcome {
        score,
        correct,
        total,
        passed,
        results,
        base_xp,
        bonus_xp,
    })
}

/// Null never matches; numbers compare by value so `1` equals `1.0`.
fn answers_match(given: &Value, expected: &Value) -> bool {
    match (given, expected) {
        (Value::Null, _) => false,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => given == expected,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizApplied {
    pub xp_earned: u64,
    pub new_achievements: Vec<&'static AchievementDef>,
    pub current_streak: u32,
}

/// Credits a scored quiz to `progress`: XP, history, streak and any
/// achievements it unlocks (first pass, perfect score, milestones).
pub fn apply_quiz(
    progress: &mut UserProgress,
    topic: &str,
    outcome: &QuizOutcome,
    now: DateTime<Utc>,
) -> QuizApplied {
    let xp_earned = outcome.xp_earned();
    progress.xp = progress.xp.saturating_add(xp_earned);
    progress.push_quiz(QuizRecord {
        topic: topic.trim().to_string(),
        score: outcome.score,
        total_questions: outcome.total,
        correct_answers: outcome.correct,
        passed: outcome.passed,
        xp_earned,
        completed_at: now,
    });
    progress.explore_topic(topic);
    record_study_day(progress, now.date_naive());
    progress.touch(now);

    let new_achievements = settle_milestones(progress, Some(now), now);

    QuizApplied {
        xp_earned,
        new_achievements,
        current_streak: progress.learning_streak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn q(answer: Value) -> QuizQuestion {
        QuizQuestion {
            question: None,
            options: vec![],
            correct_answer: answer,
            explanation: None,
        }
    }

    #[test]
    fn empty_quiz_is_rejected() {
        assert_eq!(score_quiz(&[], &[]), Err(QuizError::NoQuestions));
    }

    #[test]
    fn passing_score_earns_bonus() {
        let qs = vec![q(json!(0)), q(json!(1)), q(json!(2)), q(json!(3))];
        let out = score_quiz(&qs, &[json!(0), json!(1), json!(2), json!(0)]).unwrap();
        assert_eq!(out.correct, 3);
        assert_eq!(out.score, 75.0);
        assert!(out.passed);
        assert_eq!(out.base_xp, 8);
        assert_eq!(out.bonus_xp, 7);
        assert_eq!(out.xp_earned(), 15);
    }

    #[test]
    fn failing_score_earns_base_only() {
        let qs = vec![q(json!(0)), q(json!(1)), q(json!(2))];
        let out = score_quiz(&qs, &[json!(0)]).unwrap();
        assert_eq!(out.correct, 1);
        assert!(!out.passed);
        assert_eq!(out.bonus_xp, 0);
        assert_eq!(out.results[2].user_answer, Value::Null);
        assert!(!out.results[2].is_correct);
        assert_eq!(out.results[2].explanation, "No explanation available");
    }

    #[test]
    fn numeric_answers_compare_by_value() {
        let qs = vec![q(json!(2))];
        assert!(score_quiz(&qs, &[json!(2.0)]).unwrap().passed);
        assert!(!score_quiz(&qs, &[json!("2")]).unwrap().passed);
    }
}
