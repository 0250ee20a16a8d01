//! scenario_secrets_mode_enforcement
//!
//! All env var names below are globally-unique sentinels that are never set
//! in any CI or dev environment, so no test needs `std::env::set_var`.

use edm_config::secrets::{resolve_secrets, DEV_JWT_SECRET};
use edm_config::{load_layered_yaml_from_strings, AppConfig, RunMode};

fn config(yaml: &str) -> AppConfig {
    load_layered_yaml_from_strings(&[yaml])
        .expect("test yaml must parse cleanly")
        .app()
        .expect("test yaml must match AppConfig")
}

const SENTINELS: &str = r#"
auth:
  jwt_secret_env: "EDM_SENTINEL_JWT_MISSING_A1"
tutor:
  endpoint_env: "EDM_SENTINEL_TUTOR_ENDPOINT_MISSING_A1"
  api_key_env: "EDM_SENTINEL_TUTOR_KEY_MISSING_A1"
  deployment_env: "EDM_SENTINEL_TUTOR_DEPLOYMENT_MISSING_A1"
database:
  url_env: "EDM_SENTINEL_DB_URL_MISSING_A1"
"#;

#[test]
fn production_fails_closed_without_jwt_secret() {
    let cfg = config(SENTINELS);
    let err = resolve_secrets(&cfg, RunMode::Production).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SECRETS_MISSING"), "got: {msg}");
    assert!(
        msg.contains("EDM_SENTINEL_JWT_MISSING_A1"),
        "error must name the env var: {msg}"
    );
}

#[test]
fn development_substitutes_the_fallback_secret() {
    let cfg = config(SENTINELS);
    let s = resolve_secrets(&cfg, RunMode::Development).expect("dev must not fail");
    assert!(s.jwt_secret_is_fallback);
    assert_eq!(s.jwt_secret, DEV_JWT_SECRET);
    assert!(s.tutor.is_none(), "tutor must be mock without credentials");
    assert!(s.database_url.is_none());
}

#[test]
fn test_mode_behaves_like_development() {
    let cfg = config(SENTINELS);
    let s = resolve_secrets(&cfg, RunMode::Test).expect("test mode must not fail");
    assert!(s.jwt_secret_is_fallback);
}

#[test]
fn debug_output_is_redacted() {
    let cfg = config(SENTINELS);
    let s = resolve_secrets(&cfg, RunMode::Development).unwrap();
    let dbg = format!("{s:?}");
    assert!(dbg.contains("<REDACTED>"));
    assert!(!dbg.contains(DEV_JWT_SECRET));
}

#[test]
fn secret_literal_in_yaml_is_rejected() {
    let yaml = r#"
tutor:
  api_key_env: "sk-live-abcdefghijklmnop"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_SECRET_DETECTED"), "got: {msg}");
    assert!(msg.contains("/tutor/api_key_env"));
    assert!(!msg.contains("abcdefghijklmnop"), "value must be redacted");
}

#[test]
fn database_url_literal_is_rejected() {
    let yaml = "database:\n  url_env: \"postgres://user:pw@db/edumind\"\n";
    assert!(load_layered_yaml_from_strings(&[yaml]).is_err());
}
