//! Per-client-IP request quota.
//!
//! A window of `max_requests` per `window_secs` becomes a GCRA quota that
//! allows a burst of `max_requests` and refills one request every
//! `window / max_requests`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use edm_config::RateLimitConfig;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// `None` when disabled or when the settings describe no usable quota.
pub fn limiter_from_config(cfg: &RateLimitConfig) -> Option<IpRateLimiter> {
    if !cfg.enabled {
        return None;
    }
    let burst = NonZeroU32::new(cfg.max_requests)?;
    let window = Duration::from_secs(cfg.window_secs);
    let quota = Quota::with_period(window / burst.get())?.allow_burst(burst);
    Some(RateLimiter::keyed(quota))
}

/// Drops addresses whose quota has fully refilled, then releases the
/// freed map capacity. Returns how many addresses are still tracked.
pub fn prune(limiter: &IpRateLimiter) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    limiter.len()
}

/// Runs [`prune`] every `interval` for the life of the process.
pub fn spawn_pruner(limiter: Arc<IpRateLimiter>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let tracked = prune(&limiter);
            debug!(tracked, "rate limiter pruned");
        }
    });
}

/// Requests without connection info (in-process tests) share one bucket.
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn limit(State(st): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    if let Some(limiter) = &st.limiter {
        let ip = client_ip(&req);
        if limiter.check_key(&ip).is_err() {
            warn!(%ip, path = %req.uri().path(), "rate limit exceeded");
            return ApiError::RateLimited.into_response();
        }
    }
    next.run(req).await
}
