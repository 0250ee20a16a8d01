//! `/api/user`: learner profile, preferences, analytics, goals and
//! wellness tracking. All of it lives in the progress document except the
//! learning style, which is kept on the account.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use edm_gamify::{
    add_goal, analytics as analytics_report, evaluate_goals, record_mood, wellness_report,
    AccessibilityPatch, AnalyticsTimeframe, Energy, FontSize, Focus, GoalKind, Mood, NewGoal,
    Preferences, PreferencesPatch, MOOD_NOTES_MAX,
};
use edm_schemas::{LearningStyle, UserPatch};
use tracing::info;

use super::current_user;
use crate::{
    api_types::{
        AnalyticsQuery, GoalCreated, GoalRequest, LearnerProfile, MoodRequest, MoodResponse,
        PreferencesRequest, PreferencesResponse,
    },
    auth::AuthUser,
    error::{ApiError, ApiResult, FieldError},
    state::AppState,
    validate::{parse_serde, ApiJson, Checks},
};

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(profile))
        .route("/preferences", put(update_preferences))
        .route("/analytics", get(analytics))
        .route("/goals", post(create_goal).get(list_goals))
        .route("/mood", post(log_mood))
        .route("/wellness", get(wellness))
}

// ---------------------------------------------------------------------------
// GET /api/user/profile
// ---------------------------------------------------------------------------

pub(crate) async fn profile(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = current_user(&st, &auth).await?;
    let p = st.progress.load(user.id, Utc::now()).await;
    Ok(Json(LearnerProfile {
        id: user.id,
        name: user.display_name(),
        email: user.email.clone(),
        learning_style: user.learning_style,
        level: p.level(),
        xp: p.xp,
        achievements: p.achievements.len(),
        courses_completed: p.completed_courses.len(),
        learning_streak: p.learning_streak,
        preferences: p
            .preferences
            .clone()
            .unwrap_or_else(|| Preferences::defaults_for(user.learning_style)),
        joined_at: p.joined_at.unwrap_or(user.created_at),
        last_active: p.last_activity.or(user.last_active),
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/user/preferences
// ---------------------------------------------------------------------------

pub(crate) async fn update_preferences(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<PreferencesRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let learning_style = c.one_of(
        body.learning_style.as_deref(),
        "learningStyle",
        LearningStyle::parse,
    );
    let accessibility = body.accessibility.map(|a| AccessibilityPatch {
        high_contrast: a.high_contrast,
        font_size: c.one_of(
            a.font_size.as_deref(),
            "accessibility.fontSize",
            parse_serde::<FontSize>,
        ),
        screen_reader: a.screen_reader,
    });
    c.finish()?;

    let user = current_user(&st, &auth).await?;
    if let Some(style) = learning_style {
        st.store
            .update_user(
                user.id,
                UserPatch {
                    learning_style: Some(style),
                    ..UserPatch::default()
                },
            )
            .await?;
    }

    let now = Utc::now();
    let patch = PreferencesPatch {
        learning_style,
        notifications: body.notifications,
        accessibility,
    };
    let preferences = st
        .progress
        .update(user.id, now, |p| {
            let prefs = p
                .preferences
                .get_or_insert_with(|| Preferences::defaults_for(user.learning_style));
            prefs.apply(patch, now);
            prefs.clone()
        })
        .await;

    Ok(Json(PreferencesResponse {
        message: "Preferences updated successfully",
        preferences,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/user/analytics
// ---------------------------------------------------------------------------

pub(crate) async fn analytics(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Query(q): Query<AnalyticsQuery>,
) -> ApiResult<impl IntoResponse> {
    let user = current_user(&st, &auth).await?;
    let now = Utc::now();
    let p = st.progress.load(user.id, now).await;
    Ok(Json(analytics_report(
        &p,
        AnalyticsTimeframe::parse(q.timeframe.as_deref()),
        user.learning_style,
        now,
    )))
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

pub(crate) async fn create_goal(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<GoalRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let kind = c.one_of(body.kind.as_deref(), "type", parse_serde::<GoalKind>);
    c.check(body.kind.is_some(), "type", "is required");
    let target = body.target.and_then(|t| u64::try_from(t).ok()).filter(|t| *t >= 1);
    c.check(target.is_some(), "target", "must be an integer of at least 1");
    let deadline = body
        .deadline
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
        .map(|d| d.with_timezone(&Utc));
    c.check(deadline.is_some(), "deadline", "must be an ISO 8601 date-time");
    let title = c.required(body.title.as_deref(), "title");
    c.finish()?;

    let (Some(kind), Some(target), Some(deadline)) = (kind, target, deadline) else {
        return Err(ApiError::BadRequest("Invalid goal".into()));
    };
    let new = NewGoal {
        kind,
        target,
        deadline,
        title,
        description: body.description,
    };

    let now = Utc::now();
    let goal = st
        .progress
        .update(auth.id(), now, |p| add_goal(p, new, now))
        .await
        .map_err(|e| ApiError::Validation(vec![FieldError::new(goal_field(&e), e.to_string())]))?;
    info!(user_id = %auth.id(), goal = %goal.id, "goal created");

    Ok((
        StatusCode::CREATED,
        Json(GoalCreated {
            message: "Goal created successfully",
            goal,
        }),
    ))
}

fn goal_field(e: &edm_gamify::GoalError) -> &'static str {
    match e {
        edm_gamify::GoalError::TargetTooSmall => "target",
        edm_gamify::GoalError::TitleLength => "title",
    }
}

pub(crate) async fn list_goals(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    let now = Utc::now();
    let p = st.progress.load(auth.id(), now).await;
    Json(evaluate_goals(&p, now))
}

// ---------------------------------------------------------------------------
// Wellness
// ---------------------------------------------------------------------------

pub(crate) async fn log_mood(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<MoodRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let mood = c.one_of(body.mood.as_deref(), "mood", parse_serde::<Mood>);
    c.check(body.mood.is_some(), "mood", "is required");
    let energy = c
        .one_of(body.energy.as_deref(), "energy", parse_serde::<Energy>)
        .unwrap_or_default();
    let focus = c
        .one_of(body.focus.as_deref(), "focus", parse_serde::<Focus>)
        .unwrap_or_default();
    c.check(
        body.notes
            .as_deref()
            .map_or(true, |n| n.trim().chars().count() <= MOOD_NOTES_MAX),
        "notes",
        "must be at most 500 characters",
    );
    c.finish()?;
    let Some(mood) = mood else {
        return Err(ApiError::BadRequest("Invalid mood".into()));
    };

    let now = Utc::now();
    let entry = st
        .progress
        .update(auth.id(), now, |p| {
            record_mood(p, mood, energy, focus, body.notes, now)
        })
        .await;

    Ok(Json(MoodResponse {
        message: "Mood logged successfully",
        recommendation: mood.recommendation(),
        entry,
    }))
}

pub(crate) async fn wellness(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    let p = st.progress.load(auth.id(), Utc::now()).await;
    Json(wellness_report(&p))
}
