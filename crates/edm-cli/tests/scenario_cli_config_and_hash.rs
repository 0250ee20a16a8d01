use std::path::PathBuf;

use predicates::prelude::*;

fn write_yaml(name: &str, body: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("edm-cli-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[allow(deprecated)]
fn edm() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("edm").unwrap();
    cmd.env_remove("EDM_CONFIG").env_remove("EDM_DATABASE_URL");
    cmd
}

#[test]
fn config_hash_is_stable_and_layered() {
    let base = write_yaml("base.yaml", "server:\n  addr: 0.0.0.0:3001\nauth:\n  bcrypt_cost: 10\n");
    let local = write_yaml("local.yaml", "auth:\n  bcrypt_cost: 4\n");

    let first = edm()
        .args(["config-hash", base.to_str().unwrap(), local.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("\"bcrypt_cost\":4"))
        .get_output()
        .stdout
        .clone();

    let second = edm()
        .args(["config-hash", base.to_str().unwrap(), local.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(first, second);

    // Reversed order: the base cost wins, so the hash differs.
    let reversed = edm()
        .args(["config-hash", local.to_str().unwrap(), base.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_ne!(first, reversed);
}

#[test]
fn config_hash_refuses_secret_literals() {
    let leaky = write_yaml("leaky.yaml", "tutor:\n  api_key_env: sk-live-0123456789abcdef\n");
    edm()
        .args(["config-hash", leaky.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}

#[test]
fn hash_password_produces_a_verifiable_hash() {
    let out = edm()
        .args(["hash-password", "password123", "--cost", "4"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let hash = String::from_utf8(out).unwrap();
    assert!(bcrypt::verify("password123", hash.trim()).unwrap());
    assert!(!bcrypt::verify("password124", hash.trim()).unwrap());
}

#[test]
fn hash_password_rejects_short_passwords() {
    edm()
        .args(["hash-password", "abc", "--cost", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[test]
fn db_commands_need_a_database_url() {
    edm()
        .args(["db", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing env var EDM_DATABASE_URL"));
}
