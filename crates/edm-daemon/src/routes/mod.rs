//! Axum router and HTTP handlers for edm-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! the transport layers (CORS, tracing, body limit). The per-IP quota is
//! part of the router itself so the scenario tests see it too.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use edm_schemas::{AchievementRecord, NewAchievementRecord, User};

use crate::{
    api_types::{HealthResponse, RouteNotFound, WelcomeResponse},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    rate_limit,
    state::{uptime_secs, AppState},
};

mod ai;
mod auth;
mod gamification;
mod learning;
mod user;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/api/health", get(health))
        .nest("/api/auth", auth::router())
        .nest("/api/learning", learning::router())
        .nest("/api/ai", ai::router())
        .nest("/api/gamification", gamification::router())
        .nest("/api/user", user::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit::limit,
        ))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            timestamp: Utc::now(),
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub(crate) async fn welcome() -> impl IntoResponse {
    Json(WelcomeResponse {
        message: "Welcome to EduMind AI - Personalized Learning Platform!",
        documentation: "/api/health",
        status: "running",
        features: [
            "AI-Powered Personalized Learning",
            "Gamified Education Experience",
            "Full Accessibility Support",
            "Real-time Progress Tracking",
            "Adaptive Content Generation",
        ],
    })
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

pub(crate) async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFound {
            error: "Route not found",
            message: format!("Cannot {method} {uri}"),
            available_endpoints: [
                "GET /api/health",
                "POST /api/auth/register",
                "POST /api/auth/login",
                "GET /api/learning/courses",
                "POST /api/ai/generate-explanation",
                "GET /api/gamification/achievements",
            ],
        }),
    )
}

// ---------------------------------------------------------------------------
// Shared handler helpers
// ---------------------------------------------------------------------------

/// Account record of the caller. A valid token for a deleted account is
/// answered with 404.
pub(crate) async fn current_user(st: &AppState, auth: &AuthUser) -> ApiResult<User> {
    st.store
        .user_by_id(auth.id())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

/// Writes a ledger record and credits its points to the user's balance.
pub(crate) async fn credit_record(
    st: &AppState,
    new: NewAchievementRecord,
) -> ApiResult<AchievementRecord> {
    let user_id = new.user_id;
    let points = i64::from(new.points);
    let record = st.store.create_achievement_record(new).await?;
    st.store.add_points(user_id, points).await?;
    Ok(record)
}

/// `part` as a percentage of `total`; 0 when `total` is 0.
pub(crate) fn percent(part: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_empty_totals() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 3).round(), 33.0);
        assert_eq!(percent(2, 2), 100.0);
    }
}
