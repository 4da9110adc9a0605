//! # Reconciliation
//!
//! Pushes the local store's records back into the remote store after a
//! mission. The local state is first saved as a new snapshot, which is the
//! rollback point if the merge goes wrong; only then is the remote touched.
//!
//! Every record is merge-written (see [`crate::merge`]), so fields that exist
//! only remotely survive and re-running with unchanged local data changes
//! nothing.

use crate::batch::write_collection;
use crate::errors::SyncError;
use crate::export::read_tracked_collections;
use crate::retry::RetryPolicy;
use crate::snapshot::write_snapshot;
use crate::store::{DocumentStore, WriteMode, MAX_BATCH_WRITES};
use crate::types::{Collection, TRACKED_COLLECTIONS};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Options for a reconcile run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Directory the backup snapshot is written to.
    pub snapshot_dir: PathBuf,
    /// Time the backup snapshot is named after.
    pub timestamp: NaiveDateTime,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Read and back up the local store, but write nothing remotely.
    pub dry_run: bool,
}

impl ReconcileOptions {
    pub fn new(snapshot_dir: impl Into<PathBuf>, timestamp: NaiveDateTime) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            timestamp,
            batch_size: MAX_BATCH_WRITES,
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }
}

/// The result of a successful reconcile run.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub backup: PathBuf,
    /// Records merged per collection (or that would be, on a dry run).
    pub counts: BTreeMap<String, usize>,
    pub batches: usize,
    pub dry_run: bool,
}

/// Backs up `local` and merges all of its records into `remote`.
pub async fn reconcile(
    local: &dyn DocumentStore,
    remote: &dyn DocumentStore,
    options: &ReconcileOptions,
) -> Result<ReconcileReport, SyncError> {
    println!("Reading local store...");
    let snapshot = read_tracked_collections(local, &options.retry).await?;

    let backup = write_snapshot(&options.snapshot_dir, &snapshot, &options.timestamp)?;
    println!("💾 Local backup written to '{}'.", backup.display());

    let counts = snapshot.record_counts();
    if options.dry_run {
        info!(backup = %backup.display(), "Dry run; remote store left untouched.");
        return Ok(ReconcileReport {
            backup,
            counts,
            batches: 0,
            dry_run: true,
        });
    }

    println!("Merging into remote store...");
    let mut batches = 0;
    let empty = Collection::new();
    for collection in TRACKED_COLLECTIONS {
        let records = snapshot.collection(collection).unwrap_or(&empty);
        let summary = write_collection(
            remote,
            collection,
            records,
            WriteMode::Merge,
            options.batch_size,
            &options.retry,
        )
        .await?;
        println!("✅ {collection}: {} records merged", summary.records);
        batches += summary.batches;
    }

    info!(backup = %backup.display(), batches, "Reconcile finished.");
    Ok(ReconcileReport {
        backup,
        counts,
        batches,
        dry_run: false,
    })
}
