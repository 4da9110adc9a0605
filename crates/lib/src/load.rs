//! # Snapshot Load
//!
//! Resets a store (normally the local emulator) to the contents of a
//! snapshot. Records are written with overwrite semantics: whatever the store
//! held under the same key is replaced. Records the snapshot does not contain
//! are not deleted.
//!
//! After the data, the operator login is seeded. Seeding is best effort: the
//! data is what the field team needs, so a seeding failure only warns.

use crate::batch::write_collection;
use crate::errors::SyncError;
use crate::retry::RetryPolicy;
use crate::seed::{seed_operator, CredentialSeeder, SeedCredential, SeedStatus};
use crate::snapshot::{read_snapshot, resolve_snapshot_path};
use crate::store::{DocumentStore, WriteMode, MAX_BATCH_WRITES};
use crate::types::{Collection, TRACKED_COLLECTIONS};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Options for a load run.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Snapshot to load. When `None`, the newest snapshot in `snapshot_dir` is used.
    pub snapshot: Option<PathBuf>,
    pub snapshot_dir: PathBuf,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub seed: SeedCredential,
}

impl LoadOptions {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: None,
            snapshot_dir: snapshot_dir.into(),
            batch_size: MAX_BATCH_WRITES,
            retry: RetryPolicy::default(),
            seed: SeedCredential::default(),
        }
    }
}

/// The result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: PathBuf,
    pub counts: BTreeMap<String, usize>,
    pub batches: usize,
    pub seed: SeedStatus,
}

/// Loads a snapshot into `store`, then seeds the operator login through
/// `seeder` when one is given.
pub async fn load_snapshot(
    store: &dyn DocumentStore,
    seeder: Option<&dyn CredentialSeeder>,
    options: &LoadOptions,
) -> Result<LoadReport, SyncError> {
    let source = resolve_snapshot_path(options.snapshot.as_deref(), &options.snapshot_dir)?;
    println!("Loading snapshot '{}'...", source.display());
    info!(source = %source.display(), "Starting load.");

    let snapshot = read_snapshot(&source)?;
    snapshot.require_tracked_collections(&source)?;

    let mut counts = BTreeMap::new();
    let mut batches = 0;
    let empty = Collection::new();
    for collection in TRACKED_COLLECTIONS {
        let records = snapshot.collection(collection).unwrap_or(&empty);
        let summary = write_collection(
            store,
            collection,
            records,
            WriteMode::Overwrite,
            options.batch_size,
            &options.retry,
        )
        .await?;
        println!("✅ {collection}: {} records imported", summary.records);
        counts.insert(collection.to_string(), summary.records);
        batches += summary.batches;
    }

    let seed = seed_operator(seeder, &options.seed).await;

    Ok(LoadReport {
        source,
        counts,
        batches,
        seed,
    })
}
