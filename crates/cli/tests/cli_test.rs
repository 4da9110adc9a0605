//! # CLI Tests
//!
//! Runs the `missao-sync` binary in a scratch working directory. None of these
//! tests reach a Firestore or Auth endpoint: they cover the paths that must
//! fail (or finish) before any network call.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const TRACKED: [&str; 9] = [
    "items",
    "missions",
    "attendances",
    "beneficiaries",
    "volunteers",
    "patient_visits",
    "transactions",
    "notifications",
    "users",
];

/// A `missao-sync` command running in `dir` with no `MISSAO_` overrides.
fn missao_sync(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("missao-sync").unwrap();
    cmd.current_dir(dir);
    for (key, _) in std::env::vars() {
        if key.starts_with("MISSAO_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

/// Writes a snapshot with two items and one beneficiary.
fn write_fixture_snapshot(dir: &Path, name: &str) {
    let mut snapshot = serde_json::Map::new();
    for collection in TRACKED {
        snapshot.insert(collection.to_string(), json!({}));
    }
    snapshot.insert(
        "items".to_string(),
        json!({ "item-1": { "name": "Arroz" }, "item-2": { "name": "Feijão" } }),
    );
    snapshot.insert(
        "beneficiaries".to_string(),
        json!({ "ben-1": { "name": "Maria" } }),
    );
    fs::write(
        dir.join(name),
        serde_json::to_string_pretty(&snapshot).unwrap(),
    )
    .unwrap();
}

fn snapshot_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok()?.file_name().into_string().ok())
        .filter(|name| name.starts_with("missao-backup-"))
        .collect()
}

#[test]
fn test_export_without_credential_fails() {
    // Arrange
    let temp_dir = tempdir().unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Export failed"))
        .stderr(predicate::str::contains("serviceAccountKey.json"))
        .stderr(predicate::str::contains("Never commit"));
    assert!(snapshot_files(temp_dir.path()).is_empty());
}

#[test]
fn test_export_with_invalid_credential_fails() {
    // Arrange
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("serviceAccountKey.json"),
        r#"{"type": "authorized_user"}"#,
    )
    .unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is unusable"));
}

#[test]
fn test_reconcile_without_credential_writes_nothing() {
    // Arrange
    let temp_dir = tempdir().unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("reconcile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Reconcile failed"))
        .stderr(predicate::str::contains("serviceAccountKey.json"));
    assert!(snapshot_files(temp_dir.path()).is_empty());
}

#[test]
fn test_load_without_snapshot_fails_fast() {
    // Arrange
    let temp_dir = tempdir().unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("load")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Load failed"))
        .stderr(predicate::str::contains("No snapshot file found"));
}

#[test]
fn test_inspect_picks_newest_snapshot() {
    // Arrange
    let temp_dir = tempdir().unwrap();
    let backups = temp_dir.path().join("backups");
    fs::create_dir(&backups).unwrap();
    fs::write(backups.join("missao-backup-2025-01-01-1000.json"), "{}").unwrap();
    write_fixture_snapshot(&backups, "missao-backup-2025-02-01-0900.json");

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("inspect")
        .arg("--snapshot-dir")
        .arg(&backups)
        .assert()
        .success()
        .stdout(predicate::str::contains("missao-backup-2025-02-01-0900.json"))
        .stdout(predicate::str::contains("items: 2"))
        .stdout(predicate::str::contains("beneficiaries: 1"))
        .stdout(predicate::str::contains("Total: 3 records"));
}

#[test]
fn test_inspect_explicit_file_reports_missing_collections() {
    // Arrange
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("partial.json");
    fs::write(&path, r#"{"items": {"a": {}}, "legacy": {"x": {}}}"#).unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("inspect")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("items: 1"))
        .stdout(predicate::str::contains("users: missing"))
        .stdout(predicate::str::contains("legacy: 1 (untracked)"));
}

#[test]
fn test_inspect_unparseable_snapshot_fails() {
    // Arrange
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("missao-backup-2025-03-01-1200.json");
    fs::write(&path, "not json").unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Inspect failed"))
        .stderr(predicate::str::contains("Failed to parse snapshot"));
}

#[test]
fn test_invalid_batch_size_is_a_configuration_error() {
    // Arrange
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("missao-sync.yml"), "batch_size: 900\n").unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch_size"));
}

#[test]
fn test_missing_explicit_config_file_fails() {
    // Arrange
    let temp_dir = tempdir().unwrap();

    // Act & Assert
    missao_sync(temp_dir.path())
        .arg("inspect")
        .arg("--config")
        .arg("nowhere.yml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
