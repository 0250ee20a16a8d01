//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"JWT_SECRET"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the
//!   returned [`ResolvedSecrets`] into constructors; no other module reads
//!   `std::env::var` for secrets.
//! - `Debug` output redacts values.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! # Mode-aware enforcement
//! | Mode        | Required          |
//! |-------------|-------------------|
//! | PRODUCTION  | JWT secret        |
//! | DEVELOPMENT | nothing; a fixed development JWT secret is substituted |
//! | TEST        | nothing; same substitution |
//!
//! Tutor (Azure OpenAI) credentials are optional in every mode: without
//! both endpoint and key the tutor runs in mock mode.

use anyhow::{bail, Result};

use crate::{AppConfig, RunMode};

/// Signing secret used outside production when none is configured.
pub const DEV_JWT_SECRET: &str = "edumind-development-only-secret";

#[derive(Clone)]
pub struct ResolvedTutorCredentials {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
}

impl std::fmt::Debug for ResolvedTutorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTutorCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<REDACTED>")
            .field("deployment", &self.deployment)
            .finish()
    }
}

/// All runtime-resolved secrets for one daemon instance.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub jwt_secret: String,
    /// True when `jwt_secret` is the development fallback.
    pub jwt_secret_is_fallback: bool,
    pub tutor: Option<ResolvedTutorCredentials>,
    /// Postgres URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("jwt_secret", &"<REDACTED>")
            .field("jwt_secret_is_fallback", &self.jwt_secret_is_fallback)
            .field("tutor", &self.tutor)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable.
/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    if var_name.trim().is_empty() {
        return None;
    }
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve all secrets named by `cfg` for the given `mode`.
///
/// # Errors
/// Returns `Err` naming the env var of the first missing required secret.
pub fn resolve_secrets(cfg: &AppConfig, mode: RunMode) -> Result<ResolvedSecrets> {
    let jwt = resolve_env(&cfg.auth.jwt_secret_env);

    let (jwt_secret, jwt_secret_is_fallback) = match (jwt, mode) {
        (Some(s), _) => (s, false),
        (None, RunMode::Production) => bail!(
            "SECRETS_MISSING mode={}: required env var '{}' (JWT secret) is not set or empty",
            mode.as_str(),
            cfg.auth.jwt_secret_env,
        ),
        (None, _) => (DEV_JWT_SECRET.to_string(), true),
    };

    let endpoint = resolve_env(&cfg.tutor.endpoint_env);
    let api_key = resolve_env(&cfg.tutor.api_key_env);
    let deployment =
        resolve_env(&cfg.tutor.deployment_env).unwrap_or_else(|| cfg.tutor.deployment.clone());

    let tutor = match (endpoint, api_key) {
        (Some(endpoint), Some(api_key)) => Some(ResolvedTutorCredentials {
            endpoint,
            api_key,
            deployment,
        }),
        _ => None,
    };

    Ok(ResolvedSecrets {
        jwt_secret,
        jwt_secret_is_fallback,
        tutor,
        database_url: resolve_env(&cfg.database.url_env),
    })
}
