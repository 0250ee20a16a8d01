//! Shared runtime state for edm-daemon.
//!
//! All types here are `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum.

use std::sync::Arc;
use std::time::Duration;

use edm_cache::{ProgressStore, TokenDenylist, TtlCache};
use edm_config::AppConfig;
use edm_db::{MemStore, Store};
use edm_gamify::{AchievementDef, ActivityOutcome};
use edm_tutor::Tutor;
use serde::Serialize;
use tokio::sync::{broadcast, OnceCell};
use uuid::Uuid;

use crate::auth::{hash_password, TokenKeys};
use crate::error::ApiResult;
use crate::rate_limit::IpRateLimiter;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
///
/// Heartbeats go to every subscriber; the other variants only reach the
/// stream of the user they name.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    Xp {
        user_id: Uuid,
        source: &'static str,
        xp_earned: u64,
        total_xp: u64,
        level: u32,
    },
    Achievement {
        user_id: Uuid,
        achievement: &'static AchievementDef,
    },
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Xp { .. } => "xp",
            BusMsg::Achievement { .. } => "achievement",
        }
    }

    /// Whether `user` should receive this message.
    pub fn visible_to(&self, user: Uuid) -> bool {
        match self {
            BusMsg::Heartbeat { .. } => true,
            BusMsg::Xp { user_id, .. } | BusMsg::Achievement { user_id, .. } => *user_id == user,
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

const LOGIN_DECOY_PASSWORD: &str = "edm-login-decoy";

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    /// Generated tutor content (explanations, questions, paths).
    pub cache: TtlCache,
    pub progress: ProgressStore,
    pub denylist: TokenDenylist,
    pub tutor: Tutor,
    pub tokens: Arc<TokenKeys>,
    /// `None` when rate limiting is disabled in config.
    pub limiter: Option<Arc<IpRateLimiter>>,
    /// Hash verified for unknown emails at login; built on first use.
    pub login_decoy: Arc<OnceCell<String>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, tutor: Tutor, jwt_secret: &str) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        // Tutor content is user-keyed and bounded; session state only
        // expires by TTL.
        let cache = TtlCache::new(config.cache.max_entries);
        let sessions = TtlCache::unbounded();
        let progress = ProgressStore::new(
            sessions.clone(),
            Duration::from_secs(config.cache.progress_ttl_secs),
        );
        let denylist = TokenDenylist::new(sessions);
        let tokens = Arc::new(TokenKeys::new(
            jwt_secret.as_bytes(),
            chrono::Duration::hours(config.auth.token_ttl_hours),
        ));
        let limiter = crate::rate_limit::limiter_from_config(&config.rate_limit).map(Arc::new);

        Self {
            bus,
            build: BuildInfo {
                service: "EduMind AI Backend",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: Arc::new(config),
            store,
            cache,
            progress,
            denylist,
            tutor,
            tokens,
            limiter,
            login_decoy: Arc::new(OnceCell::new()),
        }
    }

    /// Empty in-memory store, mock tutor and the development signing secret.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemStore::new()),
            Tutor::mock(),
            edm_config::secrets::DEV_JWT_SECRET,
        )
    }

    /// bcrypt hash at the configured cost, so a login for an unknown email
    /// costs the same as one with a wrong password.
    pub async fn login_decoy_hash(&self) -> ApiResult<&str> {
        let cost = self.config.auth.bcrypt_cost;
        self.login_decoy
            .get_or_try_init(|| hash_password(LOGIN_DECOY_PASSWORD, cost))
            .await
            .map(String::as_str)
    }

    pub fn publish(&self, msg: BusMsg) {
        // No subscribers is not an error.
        let _ = self.bus.send(msg);
    }

    pub fn announce_achievements(&self, user_id: Uuid, defs: &[&'static AchievementDef]) {
        for def in defs {
            self.publish(BusMsg::Achievement {
                user_id,
                achievement: def,
            });
        }
    }

    /// Publishes the XP and achievement events of one activity.
    pub fn announce(&self, user_id: Uuid, source: &'static str, outcome: &ActivityOutcome) {
        if outcome.xp_earned > 0 {
            self.publish(BusMsg::Xp {
                user_id,
                source,
                xp_earned: outcome.xp_earned,
                total_xp: outcome.total_xp,
                level: outcome.level,
            });
        }
        self.announce_achievements(user_id, &outcome.new_achievements);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_gamify::AchievementId;

    #[test]
    fn user_events_are_scoped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let msg = BusMsg::Achievement {
            user_id: a,
            achievement: AchievementId::FirstCourse.def(),
        };
        assert!(msg.visible_to(a));
        assert!(!msg.visible_to(b));
        assert!(BusMsg::Heartbeat { ts_millis: 1 }.visible_to(b));
    }

    #[test]
    fn bus_messages_are_tagged() {
        let v = serde_json::to_value(BusMsg::Xp {
            user_id: Uuid::nil(),
            source: "quiz",
            xp_earned: 12,
            total_xp: 40,
            level: 1,
        })
        .unwrap();
        assert_eq!(v["type"], "xp");
        assert_eq!(v["xp_earned"], 12);
    }

    #[tokio::test]
    async fn announce_skips_zero_xp() {
        let st = AppState::in_memory(AppConfig::default());
        let mut rx = st.bus.subscribe();
        let user = Uuid::new_v4();
        st.announce(
            user,
            "enrollment",
            &ActivityOutcome {
                xp_earned: 0,
                new_achievements: vec![AchievementId::FirstCourse.def()],
                total_xp: 25,
                level: 1,
            },
        );
        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_name(), "achievement");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn tutor_content_churn_leaves_sessions_alone() {
        let mut cfg = AppConfig::default();
        cfg.cache.max_entries = 100;
        let st = AppState::in_memory(cfg);
        let user = Uuid::new_v4();
        st.progress
            .update(user, chrono::Utc::now(), |p| p.xp = 5_000)
            .await;
        st.denylist
            .revoke("logged-out-jti", Duration::from_secs(3_600))
            .await;

        for _ in 0..6 {
            for i in 0..300 {
                let key = edm_cache::keys::explanation(&format!("topic {i}"), "beginner", "visual");
                let _ = st.cache.get(&key).await;
                st.cache
                    .set(&key, serde_json::json!({ "n": i }), Duration::from_secs(3_600))
                    .await;
            }
        }

        assert!(st.denylist.is_revoked("logged-out-jti").await);
        assert_eq!(st.progress.load(user, chrono::Utc::now()).await.xp, 5_000);
    }
}
