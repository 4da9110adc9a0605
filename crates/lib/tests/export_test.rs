//! # Export Stage Tests
//!
//! Verifies that exporting produces one complete, immutable snapshot file and
//! that fetch failures never leave a partial snapshot behind.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use missao_sync::snapshot::read_snapshot;
use missao_sync::{export_snapshot, ExportOptions, RetryPolicy, SyncError, TRACKED_COLLECTIONS};
use missao_sync_test_utils::{seed_mission_dataset, InjectedFailure, MemoryStore};
use std::time::Duration;
use tempfile::tempdir;

fn export_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn instant_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_export_writes_every_tracked_collection() -> Result<()> {
    // --- Arrange ---
    let remote = MemoryStore::new();
    seed_mission_dataset(&remote);
    let dir = tempdir()?;
    let options = ExportOptions {
        snapshot_dir: dir.path().to_path_buf(),
        timestamp: export_time(),
        retry: instant_retry(),
    };

    // --- Act ---
    let report = export_snapshot(&remote, &options).await?;

    // --- Assert ---
    assert_eq!(
        report.path,
        dir.path().join("missao-backup-2025-01-01-1000.json")
    );
    let snapshot = read_snapshot(&report.path)?;
    let names: Vec<&str> = snapshot.collection_names().collect();
    let mut expected = TRACKED_COLLECTIONS.to_vec();
    expected.sort();
    assert_eq!(names, expected);

    // `notifications` holds nothing but is still present, as an empty map.
    assert!(snapshot.collection("notifications").unwrap().is_empty());
    assert_eq!(report.counts["notifications"], 0);
    assert_eq!(report.counts["items"], 2);
    assert_eq!(snapshot.total_records(), 9);
    Ok(())
}

#[tokio::test]
async fn test_export_of_an_empty_store_still_lists_nine_collections() -> Result<()> {
    let remote = MemoryStore::new();
    let dir = tempdir()?;
    let options = ExportOptions {
        snapshot_dir: dir.path().to_path_buf(),
        timestamp: export_time(),
        retry: instant_retry(),
    };

    let report = export_snapshot(&remote, &options).await?;

    let text = std::fs::read_to_string(&report.path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 9);
    for name in TRACKED_COLLECTIONS {
        assert_eq!(object[name], serde_json::json!({}), "collection {name}");
    }
    Ok(())
}

#[tokio::test]
async fn test_export_retries_transient_fetch_failures() -> Result<()> {
    let remote = MemoryStore::new();
    seed_mission_dataset(&remote);
    remote.fail_fetches(
        "beneficiaries",
        vec![InjectedFailure::Transient, InjectedFailure::Transient],
    );
    let dir = tempdir()?;
    let options = ExportOptions {
        snapshot_dir: dir.path().to_path_buf(),
        timestamp: export_time(),
        retry: instant_retry(),
    };

    let report = export_snapshot(&remote, &options).await?;

    assert_eq!(report.counts["beneficiaries"], 1);
    assert_eq!(remote.fetch_count(), TRACKED_COLLECTIONS.len() + 2);
    Ok(())
}

#[tokio::test]
async fn test_export_failure_leaves_no_partial_snapshot() -> Result<()> {
    let remote = MemoryStore::new();
    seed_mission_dataset(&remote);
    remote.fail_fetches("transactions", vec![InjectedFailure::Permanent]);
    let dir = tempdir()?;
    let options = ExportOptions {
        snapshot_dir: dir.path().to_path_buf(),
        timestamp: export_time(),
        retry: instant_retry(),
    };

    let err = export_snapshot(&remote, &options).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Fetch { ref collection, .. } if collection == "transactions"
    ));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_export_never_overwrites_an_existing_snapshot() -> Result<()> {
    let remote = MemoryStore::new();
    seed_mission_dataset(&remote);
    let dir = tempdir()?;
    let options = ExportOptions {
        snapshot_dir: dir.path().to_path_buf(),
        timestamp: export_time(),
        retry: instant_retry(),
    };
    let first = export_snapshot(&remote, &options).await?;
    let before = std::fs::read_to_string(&first.path)?;

    remote.put("items", "item-new", serde_json::json!({ "name": "Gaze" }));
    let err = export_snapshot(&remote, &options).await.unwrap_err();

    assert!(matches!(err, SyncError::SnapshotExists { .. }));
    assert_eq!(std::fs::read_to_string(&first.path)?, before);
    Ok(())
}
