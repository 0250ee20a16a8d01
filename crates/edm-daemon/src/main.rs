//! edm-daemon entry point.
//!
//! Thin on purpose: it sets up tracing, resolves configuration and
//! secrets, builds the shared state, wires middleware and starts the HTTP
//! server. Route handlers live in `routes/`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use edm_config::{secrets::resolve_secrets, AppConfig, RunMode};
use edm_daemon::{auth::hash_password, rate_limit, routes, state};
use edm_db::{MemStore, PgStore, Store};
use edm_tutor::{AzureOpenAi, AzureSettings, Tutor};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const HEARTBEAT_EVERY: Duration = Duration::from_secs(15);
const LIMITER_PRUNE_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let mode = RunMode::parse(&std::env::var("EDM_MODE").unwrap_or_else(|_| "development".into()))?;
    let loaded = edm_config::load_from_env()?;
    let cfg = loaded.app()?;
    let secrets = resolve_secrets(&cfg, mode)?;
    info!(mode = mode.as_str(), config_hash = %loaded.config_hash, "configuration loaded");
    if secrets.jwt_secret_is_fallback {
        warn!("JWT secret not set; using the development fallback secret");
    }

    let store = open_store(&cfg, secrets.database_url.as_deref()).await?;
    if cfg.seed.demo_data {
        let hash = hash_password(edm_db::DEMO_PASSWORD, cfg.auth.bcrypt_cost).await?;
        let report = edm_db::seed_demo(store.as_ref(), &hash).await?;
        info!(?report, "demo data seeded");
    }

    let tutor = match &secrets.tutor {
        Some(creds) => {
            let client = AzureOpenAi::new(AzureSettings {
                endpoint: creds.endpoint.clone(),
                api_key: creds.api_key.clone(),
                deployment: creds.deployment.clone(),
                api_version: cfg.tutor.api_version.clone(),
                timeout: Duration::from_secs(cfg.tutor.timeout_secs),
            })?;
            info!(url = client.url(), "azure openai tutor enabled");
            Tutor::with_client(Arc::new(client))
        }
        None => {
            info!("azure openai credentials not set; using mock tutor");
            Tutor::mock()
        }
    };

    let shared = Arc::new(state::AppState::new(
        cfg.clone(),
        store,
        tutor,
        &secrets.jwt_secret,
    ));

    state::spawn_heartbeat(shared.bus.clone(), HEARTBEAT_EVERY);
    if let Some(limiter) = &shared.limiter {
        rate_limit::spawn_pruner(Arc::clone(limiter), LIMITER_PRUNE_EVERY);
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(RequestBodyLimitLayer::new(cfg.server.body_limit_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_config(&cfg.server.cors_origins));

    let addr = bind_addr_from_env()
        .or_else(|| cfg.server.addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3001)));
    info!("edm-daemon listening on http://{}", addr);

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("EDM_DAEMON_ADDR").ok()?.parse().ok()
}

/// Postgres when a database URL resolves, otherwise the in-memory store.
async fn open_store(cfg: &AppConfig, url: Option<&str>) -> anyhow::Result<Arc<dyn Store>> {
    match url {
        Some(url) => {
            let pool = edm_db::connect(url, cfg.database.max_connections).await?;
            edm_db::migrate(&pool).await?;
            info!("postgres store ready");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("no database url; data lives in memory and is lost on exit");
            Ok(Arc::new(MemStore::new()))
        }
    }
}

/// CORS: only the configured origins.
fn cors_from_config(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}
