//! `/api/ai`: tutor content generation, quiz scoring and chat.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use edm_cache::keys;
use edm_gamify::{apply_quiz, score_quiz, QuizError};
use edm_schemas::{Difficulty, LearningStyle};
use edm_tutor::{Explanation, LearningPath, QuestionSet};
use tracing::debug;

use super::current_user;
use crate::{
    api_types::{
        ChatBody, ExplanationRequest, Generated, LearningPathRequest, QuestionsRequest,
        QuizFeedback, QuizResponse, SubmitQuizRequest,
    },
    auth::AuthUser,
    error::{ApiError, ApiResult, FieldError},
    state::AppState,
    validate::{ApiJson, Checks},
};

pub(super) const DEFAULT_QUESTION_COUNT: i64 = 5;
pub(super) const MAX_QUESTION_COUNT: i64 = 10;
const GOALS_MIN: usize = 5;
const DEFAULT_TIMEFRAME: &str = "4 weeks";

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status))
        .route("/generate-explanation", post(generate_explanation))
        .route("/generate-questions", post(generate_questions))
        .route("/generate-learning-path", post(generate_learning_path))
        .route("/submit-quiz", post(submit_quiz))
        .route("/chat", post(chat))
}

/// Request style first, then the style on the account.
async fn resolve_style(
    st: &AppState,
    auth: &AuthUser,
    requested: Option<LearningStyle>,
) -> ApiResult<LearningStyle> {
    match requested {
        Some(s) => Ok(s),
        None => Ok(current_user(st, auth).await?.learning_style),
    }
}

pub(crate) async fn status(State(st): State<Arc<AppState>>, _auth: AuthUser) -> impl IntoResponse {
    Json(st.tutor.status())
}

// ---------------------------------------------------------------------------
// POST /api/ai/generate-explanation
// ---------------------------------------------------------------------------

pub(crate) async fn generate_explanation(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ExplanationRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let topic = c.required(body.topic.as_deref(), "topic");
    let difficulty = c
        .one_of(body.difficulty.as_deref(), "difficulty", Difficulty::parse)
        .unwrap_or_default();
    let requested = c.one_of(
        body.learning_style.as_deref(),
        "learningStyle",
        LearningStyle::parse,
    );
    c.finish()?;
    let style = resolve_style(&st, &auth, requested).await?;

    let key = keys::explanation(&topic, difficulty.as_str(), style.as_str());
    if let Some(hit) = st.cache.get_as::<Explanation>(&key).await {
        debug!(%key, "explanation cache hit");
        return Ok(Json(Generated::cached(hit)));
    }

    let explanation = st.tutor.explain(&topic, difficulty, style).await;
    let ttl = Duration::from_secs(st.config.cache.explanation_ttl_secs);
    st.cache
        .set_as(&key, &explanation, ttl)
        .await
        .map_err(ApiError::internal)?;

    let now = Utc::now();
    let outcome = st
        .progress
        .update(auth.id(), now, |p| {
            edm_gamify::record_explanation(p, &topic, now)
        })
        .await;
    st.announce(auth.id(), "explanation", &outcome);
    Ok(Json(Generated::fresh(explanation, outcome)))
}

// ---------------------------------------------------------------------------
// POST /api/ai/generate-questions
// ---------------------------------------------------------------------------

pub(crate) async fn generate_questions(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<QuestionsRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let topic = c.required(body.topic.as_deref(), "topic");
    let count = body.count.unwrap_or(DEFAULT_QUESTION_COUNT);
    c.check(
        (1..=MAX_QUESTION_COUNT).contains(&count),
        "count",
        "must be between 1 and 10",
    );
    let difficulty = c
        .one_of(body.difficulty.as_deref(), "difficulty", Difficulty::parse)
        .unwrap_or_default();
    c.finish()?;
    let count = u8::try_from(count).map_err(ApiError::internal)?;

    let key = keys::questions(&topic, count, difficulty.as_str());
    if let Some(hit) = st.cache.get_as::<QuestionSet>(&key).await {
        debug!(%key, "questions cache hit");
        return Ok(Json(Generated::cached(hit)));
    }

    let set = st.tutor.questions(&topic, count, difficulty).await;
    let ttl = Duration::from_secs(st.config.cache.questions_ttl_secs);
    st.cache
        .set_as(&key, &set, ttl)
        .await
        .map_err(ApiError::internal)?;

    let now = Utc::now();
    let outcome = st
        .progress
        .update(auth.id(), now, |p| edm_gamify::record_practice(p, &topic, now))
        .await;
    st.announce(auth.id(), "practice", &outcome);
    Ok(Json(Generated::fresh(set, outcome)))
}

// ---------------------------------------------------------------------------
// POST /api/ai/generate-learning-path
// ---------------------------------------------------------------------------

pub(crate) async fn generate_learning_path(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<LearningPathRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let subject = c.required(body.subject.as_deref(), "subject");
    let level = c.one_of(
        body.current_level.as_deref(),
        "currentLevel",
        Difficulty::parse,
    );
    c.check(body.current_level.is_some(), "currentLevel", "is required");
    let goals = body.goals.as_deref().unwrap_or_default().trim().to_string();
    c.check(
        goals.chars().count() >= GOALS_MIN,
        "goals",
        "must be at least 5 characters",
    );
    c.finish()?;
    let level = level.unwrap_or_default();
    let timeframe = body
        .timeframe
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string());

    let key = keys::learning_path(auth.id(), &subject, level.as_str());
    if let Some(hit) = st.cache.get_as::<LearningPath>(&key).await {
        debug!(%key, "learning path cache hit");
        return Ok(Json(Generated::cached(hit)));
    }

    let path = st
        .tutor
        .learning_path(&subject, level, &goals, &timeframe)
        .await;
    let ttl = Duration::from_secs(st.config.cache.learning_path_ttl_secs);
    st.cache
        .set_as(&key, &path, ttl)
        .await
        .map_err(ApiError::internal)?;

    let now = Utc::now();
    let outcome = st
        .progress
        .update(auth.id(), now, |p| {
            edm_gamify::record_learning_path(p, &subject, now)
        })
        .await;
    st.announce(auth.id(), "learning_path", &outcome);
    Ok(Json(Generated::fresh(path, outcome)))
}

// ---------------------------------------------------------------------------
// POST /api/ai/submit-quiz
// ---------------------------------------------------------------------------

fn feedback_message(score: f64, passed: bool) -> String {
    if passed {
        format!("Excellent work! You scored {score}%")
    } else {
        format!("Good effort! You scored {score}%. Keep practicing to improve!")
    }
}

pub(crate) async fn submit_quiz(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<SubmitQuizRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let topic = c.required(body.topic.as_deref(), "topic");
    c.check(body.answers.is_some(), "answers", "must be an array");
    c.check(body.questions.is_some(), "questions", "must be an array");
    c.finish()?;
    let answers = body.answers.unwrap_or_default();
    let questions = body.questions.unwrap_or_default();

    let outcome = score_quiz(&questions, &answers).map_err(|e| match e {
        QuizError::NoQuestions => {
            ApiError::Validation(vec![FieldError::new("questions", "must not be empty")])
        }
    })?;

    let now = Utc::now();
    let (applied, total_xp, level) = st
        .progress
        .update(auth.id(), now, |p| {
            let applied = apply_quiz(p, &topic, &outcome, now);
            (applied, p.xp, p.level())
        })
        .await;
    st.announce(
        auth.id(),
        "quiz",
        &edm_gamify::ActivityOutcome {
            xp_earned: applied.xp_earned,
            new_achievements: applied.new_achievements.clone(),
            total_xp,
            level,
        },
    );

    Ok(Json(QuizResponse {
        feedback: QuizFeedback {
            message: feedback_message(outcome.score, outcome.passed),
            xp_earned: applied.xp_earned,
            new_achievements: applied.new_achievements,
            current_streak: applied.current_streak,
        },
        outcome,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/ai/chat
// ---------------------------------------------------------------------------

pub(crate) async fn chat(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ChatBody>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let message = c.required(body.message.as_deref(), "message");
    c.finish()?;
    let style = current_user(&st, &auth).await?.learning_style;
    Ok(Json(st.tutor.chat(
        &message,
        style,
        body.context.unwrap_or_default(),
    )))
}
