//! # Round-Trip Tests
//!
//! Export from one store, load into an empty one, and compare.

use anyhow::Result;
use chrono::NaiveDate;
use missao_sync::{
    export_snapshot, load_snapshot, ExportOptions, LoadOptions, RetryPolicy, TRACKED_COLLECTIONS,
};
use missao_sync_test_utils::{seed_mission_dataset, MemoryStore};
use serde_json::json;
use tempfile::tempdir;

#[tokio::test]
async fn test_export_then_load_reproduces_the_store() -> Result<()> {
    // --- Arrange ---
    let remote = MemoryStore::new();
    seed_mission_dataset(&remote);
    remote.fill("items", 740);
    remote.put(
        "transactions",
        "tx-odd",
        json!({
            "amount": -0.5,
            "big": 9007199254740993u64,
            "text": "acentuação, emoji 🚑 e \"aspas\"",
            "nested": [{ "a": [] }, null, true],
            "when": { "_seconds": 1740000000, "_nanoseconds": 123000000 }
        }),
    );
    let dir = tempdir()?;
    let export = ExportOptions {
        snapshot_dir: dir.path().to_path_buf(),
        timestamp: NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
        retry: RetryPolicy::none(),
    };

    // --- Act ---
    let exported = export_snapshot(&remote, &export).await?;
    let local = MemoryStore::new();
    let loaded = load_snapshot(&local, None, &LoadOptions::new(dir.path())).await?;

    // --- Assert ---
    assert_eq!(loaded.source, exported.path);
    assert_eq!(loaded.counts, exported.counts);
    for collection in TRACKED_COLLECTIONS {
        assert_eq!(
            local.collection(collection),
            remote.collection(collection),
            "collection {collection}"
        );
    }
    assert_eq!(local.dump(), remote.dump());
    Ok(())
}
