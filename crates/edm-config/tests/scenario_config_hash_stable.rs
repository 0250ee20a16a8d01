use edm_config::{load_layered_yaml_from_strings, AppConfig};

#[test]
fn hash_is_stable_across_key_order() {
    let a = "server:\n  addr: \"127.0.0.1:1\"\nrate_limit:\n  max_requests: 5\n";
    let b = "rate_limit:\n  max_requests: 5\nserver:\n  addr: \"127.0.0.1:1\"\n";

    let la = load_layered_yaml_from_strings(&[a]).unwrap();
    let lb = load_layered_yaml_from_strings(&[b]).unwrap();

    assert_eq!(la.canonical_json, lb.canonical_json);
    assert_eq!(la.config_hash, lb.config_hash);
    assert_eq!(la.config_hash.len(), 64);
}

#[test]
fn hash_changes_when_a_value_changes() {
    let a = load_layered_yaml_from_strings(&["cache:\n  questions_ttl_secs: 60\n"]).unwrap();
    let b = load_layered_yaml_from_strings(&["cache:\n  questions_ttl_secs: 61\n"]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn empty_config_yields_defaults() {
    let cfg = load_layered_yaml_from_strings(&[]).unwrap().app().unwrap();
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(cfg.rate_limit.max_requests, 100);
    assert_eq!(cfg.rate_limit.window_secs, 900);
    assert_eq!(cfg.auth.token_ttl_hours, 168);
    assert_eq!(cfg.cache.progress_ttl_secs, 86_400);
    assert_eq!(cfg.tutor.deployment, "gpt-4");
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let base = "cache:\n  explanation_ttl_secs: 10\n";
    let over = "rate_limit:\n  enabled: false\n";
    let cfg = load_layered_yaml_from_strings(&[base, over])
        .unwrap()
        .app()
        .unwrap();
    assert_eq!(cfg.cache.explanation_ttl_secs, 10);
    assert_eq!(cfg.cache.questions_ttl_secs, 1_800);
    assert!(!cfg.rate_limit.enabled);
    assert_eq!(cfg.rate_limit.max_requests, 100);
}

#[test]
fn wrong_type_is_a_schema_error() {
    let loaded = load_layered_yaml_from_strings(&["rate_limit:\n  max_requests: lots\n"]).unwrap();
    assert!(loaded.app().is_err());
}
