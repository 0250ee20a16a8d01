//! Scenario: the per-IP quota sits in front of every route, including the
//! public ones and the 404 fallback.

use std::sync::Arc;

use axum::http::StatusCode;
use edm_config::AppConfig;
use edm_daemon::{routes, state::AppState};
use edm_testkit::{call_json, get};

fn limited_state(max_requests: u32) -> Arc<AppState> {
    let mut cfg = AppConfig::default();
    cfg.auth.bcrypt_cost = 4;
    cfg.rate_limit.enabled = true;
    cfg.rate_limit.max_requests = max_requests;
    cfg.rate_limit.window_secs = 3600;
    Arc::new(AppState::in_memory(cfg))
}

#[tokio::test]
async fn requests_beyond_the_burst_are_rejected() {
    let st = limited_state(3);

    for path in ["/api/health", "/", "/api/missing"] {
        let (status, _) = call_json(routes::build_router(Arc::clone(&st)), get(path, None)).await;
        assert_ne!(status, StatusCode::TOO_MANY_REQUESTS, "{path} within quota");
    }

    let (status, v) = call_json(routes::build_router(Arc::clone(&st)), get("/api/health", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(v["error"], "Too many requests");
    assert_eq!(
        v["message"],
        "Too many requests from this IP, please try again later."
    );
}

#[tokio::test]
async fn disabled_limiter_lets_everything_through() {
    let mut cfg = AppConfig::default();
    cfg.rate_limit.enabled = false;
    let st = Arc::new(AppState::in_memory(cfg));

    for _ in 0..20 {
        let (status, _) =
            call_json(routes::build_router(Arc::clone(&st)), get("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
