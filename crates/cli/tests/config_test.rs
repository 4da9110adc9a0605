//! # Configuration Tests
//!
//! `cli` is a binary crate, so the `config` module is included directly.

#[path = "../src/config.rs"]
mod config;

use self::config::{get_config, ConfigError};
use missao_sync::ConnectionTarget;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

// Environment variables are process-global; tests touching them run one at a time.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 7] = [
    "MISSAO_BATCH_SIZE",
    "MISSAO_PROJECT_ID",
    "MISSAO_CREDENTIAL_PATH",
    "MISSAO_EMULATOR__FIRESTORE_PORT",
    "MISSAO_RETRY__MAX_ATTEMPTS",
    "MISSAO_SEED__EMAIL",
    "MISSAO_TEST_PASSWORD",
];

fn clear_env_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

fn write_config(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("missao-sync.yml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_defaults() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();

    let config = get_config(None).expect("defaults should load");

    assert_eq!(config.credential_path, PathBuf::from("serviceAccountKey.json"));
    assert_eq!(config.project_id, None);
    assert_eq!(config.batch_size, 500);
    assert_eq!(config.emulator.host, "127.0.0.1");
    assert_eq!(config.emulator.firestore_port, 8080);
    assert_eq!(config.emulator.auth_port, 9099);
    assert_eq!(config.emulator.project_id, "demo-missao");
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.seed.uid, "operador-missao");
    assert_eq!(config.seed.email, "operador@missao.local");
    assert_eq!(
        config.local_target(),
        ConnectionTarget::Local {
            host: "127.0.0.1".to_string(),
            port: 8080,
            project_id: "demo-missao".to_string(),
        }
    );
}

#[test]
fn test_yaml_file_with_substitution() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    let dir = tempdir().unwrap();
    env::set_var("MISSAO_TEST_PASSWORD", "s3cret-field");
    let path = write_config(
        dir.path(),
        r#"
credential_path: keys/prod.json
project_id: missao-prod
snapshot_dir: backups
batch_size: 250
emulator:
  firestore_port: 8181
retry:
  max_attempts: 5
  base_delay_ms: 100
  max_delay_ms: 1000
seed:
  password: "${MISSAO_TEST_PASSWORD}"
"#,
    );

    let config = get_config(Some(&path)).expect("file config should load");

    assert_eq!(config.batch_size, 250);
    assert_eq!(config.snapshot_dir, PathBuf::from("backups"));
    assert_eq!(config.emulator.firestore_port, 8181);
    // Keys absent from the file keep their defaults.
    assert_eq!(config.emulator.auth_port, 9099);
    assert_eq!(config.seed.password, "s3cret-field");
    assert_eq!(config.seed.uid, "operador-missao");
    assert_eq!(
        config.remote_target(),
        ConnectionTarget::Remote {
            credential_path: PathBuf::from("keys/prod.json"),
            project_id: Some("missao-prod".to_string()),
        }
    );
    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.base_delay, Duration::from_millis(100));
    assert_eq!(policy.max_delay, Duration::from_millis(1000));

    clear_env_vars();
}

#[test]
fn test_environment_overrides_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "batch_size: 250\n");
    env::set_var("MISSAO_BATCH_SIZE", "100");
    env::set_var("MISSAO_EMULATOR__FIRESTORE_PORT", "9191");
    env::set_var("MISSAO_SEED__EMAIL", "campo@missao.local");

    let config = get_config(Some(&path)).expect("config should load");

    assert_eq!(config.batch_size, 100);
    assert_eq!(config.emulator.firestore_port, 9191);
    assert_eq!(config.seed.email, "campo@missao.local");

    clear_env_vars();
}

#[test]
fn test_explicit_config_file_must_exist() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    let dir = tempdir().unwrap();

    let result = get_config(Some(&dir.path().join("absent.yml")));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_batch_size_out_of_range_is_rejected() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();

    for size in ["0", "501"] {
        env::set_var("MISSAO_BATCH_SIZE", size);
        let result = get_config(None);
        assert!(
            matches!(result, Err(ConfigError::Invalid(ref msg)) if msg.contains("batch_size")),
            "batch size {size} should be rejected, got {result:?}"
        );
    }

    clear_env_vars();
}

#[test]
fn test_zero_attempts_is_rejected() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    env::set_var("MISSAO_RETRY__MAX_ATTEMPTS", "0");

    let result = get_config(None);

    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    clear_env_vars();
}
