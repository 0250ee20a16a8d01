//! `/api/gamification`: achievements, leaderboard, XP progress,
//! challenges and the per-user SSE stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use edm_gamify::{
    award_xp, catalog, level_progress, rank_leaderboard, settle_milestones, Contender,
    LeaderboardTimeframe, DEFAULT_LEADERBOARD_LIMIT,
};
use futures_util::stream::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    api_types::{
        AchievementsResponse, AwardXpRequest, AwardXpResponse, EarnedView, LeaderboardQuery,
        ProgressStats,
    },
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::{AppState, BusMsg},
    validate::ApiJson,
};

const AVAILABLE_PREVIEW: usize = 10;
const RECENT_ACHIEVEMENTS: usize = 3;
const RECENT_QUIZZES: usize = 5;
const LEADERBOARD_MAX: usize = 100;

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/achievements", get(achievements))
        .route("/leaderboard", get(leaderboard))
        .route("/progress", get(progress))
        .route("/award-xp", post(award))
        .route("/challenges", get(challenges))
        .route("/stream", get(stream))
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

// ---------------------------------------------------------------------------
// GET /api/gamification/achievements
// ---------------------------------------------------------------------------

pub(crate) async fn achievements(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    let p = st.progress.load(auth.id(), Utc::now()).await;
    let earned: Vec<EarnedView> = p.achievements.iter().map(EarnedView::from).collect();
    let available = catalog()
        .iter()
        .filter(|d| !p.has(d.id))
        .take(AVAILABLE_PREVIEW)
        .collect();
    Json(AchievementsResponse {
        total_earned: earned.len(),
        total_available: catalog().len(),
        earned,
        available,
    })
}

// ---------------------------------------------------------------------------
// GET /api/gamification/leaderboard
// ---------------------------------------------------------------------------

pub(crate) async fn leaderboard(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Query(q): Query<LeaderboardQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = q
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, LEADERBOARD_MAX);
    let names: HashMap<Uuid, String> = st
        .store
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u.display_name()))
        .collect();

    // Documents whose account is gone are left out.
    let contenders = st
        .progress
        .all()
        .into_iter()
        .filter_map(|(id, p)| {
            Some(Contender {
                user_id: id,
                name: names.get(&id)?.clone(),
                xp: p.xp,
                achievements: p.achievements.len(),
                streak: p.learning_streak,
                last_activity: p.last_activity,
            })
        })
        .collect();

    Ok(Json(rank_leaderboard(
        contenders,
        auth.id(),
        limit,
        LeaderboardTimeframe::parse(q.timeframe.as_deref()),
        Utc::now(),
    )))
}

// ---------------------------------------------------------------------------
// GET /api/gamification/progress
// ---------------------------------------------------------------------------

pub(crate) async fn progress(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    let now = Utc::now();
    let (p, new_achievements) = st
        .progress
        .update(auth.id(), now, |p| {
            let granted = settle_milestones(p, None, now);
            (p.clone(), granted)
        })
        .await;
    st.announce_achievements(auth.id(), &new_achievements);

    let lp = level_progress(p.xp);
    let average_quiz_score = p.average_quiz_score().round() as u64;

    Json(ProgressStats {
        level: lp.level,
        xp: lp.xp,
        xp_to_next_level: lp.xp_to_next_level,
        progress_to_next_level: lp.progress_to_next_level,
        courses_completed: p.completed_courses.len(),
        courses_enrolled: p.enrolled_courses.len(),
        achievements_unlocked: p.achievements.len(),
        learning_streak: p.learning_streak,
        topics_explored: p.topics_explored.len(),
        quizzes_completed: p.quizzes_taken(),
        total_study_time: p.xp / 2,
        average_quiz_score,
        best_streak: p.best_streak.max(p.learning_streak),
        last_active: p.last_activity,
        recent_achievements: tail(&p.achievements, RECENT_ACHIEVEMENTS)
            .iter()
            .map(|e| e.id.def())
            .collect(),
        recent_quizzes: tail(&p.quiz_history, RECENT_QUIZZES).to_vec(),
        new_achievements,
    })
}

// ---------------------------------------------------------------------------
// POST /api/gamification/award-xp
// ---------------------------------------------------------------------------

pub(crate) async fn award(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<AwardXpRequest>,
) -> ApiResult<impl IntoResponse> {
    let target = match body.user_id {
        Some(id) if id != auth.id() => {
            if !auth.role().can_author() {
                return Err(ApiError::Forbidden(
                    "Only teachers and admins can award XP to other users".into(),
                ));
            }
            if st.store.user_by_id(id).await?.is_none() {
                return Err(ApiError::not_found("User"));
            }
            id
        }
        _ => auth.id(),
    };

    let now = Utc::now();
    let amount = body.amount.unwrap_or(0);
    let xp = st
        .progress
        .update(target, now, |p| award_xp(p, amount, now))
        .await
        .map_err(|_| ApiError::BadRequest("Invalid XP amount".into()))?;

    st.publish(BusMsg::Xp {
        user_id: target,
        source: "manual",
        xp_earned: xp.xp_awarded,
        total_xp: xp.new_xp,
        level: xp.new_level,
    });
    let reason = body
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "Manual XP award".to_string());
    info!(by = %auth.id(), user_id = %target, amount = xp.xp_awarded, %reason, "xp awarded");

    Ok(Json(AwardXpResponse {
        message: "XP awarded successfully",
        user_id: target,
        reason,
        award: xp,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/gamification/challenges
// ---------------------------------------------------------------------------

pub(crate) async fn challenges(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    let now = Utc::now();
    let p = st.progress.load(auth.id(), now).await;
    Json(edm_gamify::challenges(&p, now))
}

// ---------------------------------------------------------------------------
// GET /api/gamification/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>, auth: AuthUser) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx, auth.id());

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
    user: Uuid,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(move |msg| async move {
        match msg {
            Ok(m) if m.visible_to(user) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            // other users' events, lagged or closed
            _ => None,
        }
    })
}
