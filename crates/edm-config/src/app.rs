use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed daemon configuration. Unknown keys are ignored; missing keys take
/// the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub tutor: TutorConfig,
    pub database: DatabaseConfig,
    pub seed: SeedConfig,
}

impl AppConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        serde_json::from_value(v.clone()).context("config does not match AppConfig schema")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub cors_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3001".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    /// Env var NAME holding the JWT signing secret.
    pub jwt_secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: 24 * 7,
            bcrypt_cost: 10,
            jwt_secret_env: "JWT_SECRET".to_string(),
        }
    }
}

/// Cache lifetimes in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub progress_ttl_secs: u64,
    pub explanation_ttl_secs: u64,
    pub questions_ttl_secs: u64,
    pub learning_path_ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            progress_ttl_secs: 86_400,
            explanation_ttl_secs: 3_600,
            questions_ttl_secs: 1_800,
            learning_path_ttl_secs: 7_200,
            max_entries: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub deployment: String,
    pub api_version: String,
    pub timeout_secs: u64,
    /// Env var NAME holding the Azure OpenAI endpoint URL.
    pub endpoint_env: String,
    /// Env var NAME holding the Azure OpenAI API key.
    pub api_key_env: String,
    /// Env var NAME that overrides `deployment` when set.
    pub deployment_env: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            deployment: "gpt-4".to_string(),
            api_version: "2024-10-21".to_string(),
            timeout_secs: 30,
            endpoint_env: "AZURE_OPENAI_ENDPOINT".to_string(),
            api_key_env: "AZURE_OPENAI_API_KEY".to_string(),
            deployment_env: "AZURE_OPENAI_DEPLOYMENT_NAME".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Env var NAME holding the Postgres URL. Unset → in-memory store.
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "EDM_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Seed demo users and courses at boot. Existing rows are left alone.
    pub demo_data: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { demo_data: true }
    }
}
