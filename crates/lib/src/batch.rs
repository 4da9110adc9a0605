//! Chunked, retried writes of a whole collection.

use crate::errors::SyncError;
use crate::retry::RetryPolicy;
use crate::store::{DocumentStore, WriteMode, WriteOp, MAX_BATCH_WRITES};
use crate::types::Collection;
use tracing::{error, info};

/// What [`write_collection`] committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    pub batches: usize,
}

/// Writes every record of `records` into `collection` of `store`.
///
/// Records are grouped into batches of at most `batch_size` operations (never
/// more than [`MAX_BATCH_WRITES`]). A batch is committed as soon as it is full,
/// and each commit completes before the next batch is built. A commit that
/// still fails after `retry` is exhausted aborts the collection; the error
/// reports how many records were committed before it.
pub async fn write_collection(
    store: &dyn DocumentStore,
    collection: &str,
    records: &Collection,
    mode: WriteMode,
    batch_size: usize,
    retry: &RetryPolicy,
) -> Result<BatchSummary, SyncError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_WRITES);
    let total = records.len();
    let mut summary = BatchSummary::default();
    let mut pending: Vec<WriteOp> = Vec::with_capacity(batch_size.min(total));

    for (index, (key, fields)) in records.iter().enumerate() {
        pending.push(WriteOp {
            key: key.clone(),
            fields: fields.clone(),
            mode,
        });
        if pending.len() == batch_size || index + 1 == total {
            commit(store, collection, &pending, retry, summary.records, total).await?;
            summary.records += pending.len();
            summary.batches += 1;
            pending.clear();
            println!("  {collection}: {}/{total} records written", summary.records);
        }
    }

    info!(
        collection,
        records = summary.records,
        batches = summary.batches,
        ?mode,
        "Collection written."
    );
    Ok(summary)
}

async fn commit(
    store: &dyn DocumentStore,
    collection: &str,
    writes: &[WriteOp],
    retry: &RetryPolicy,
    committed: usize,
    total: usize,
) -> Result<(), SyncError> {
    let op_name = format!("commit {collection}");
    retry
        .run(&op_name, || store.commit_batch(collection, writes))
        .await
        .map_err(|source| {
            error!(
                collection,
                committed,
                total,
                error = %source,
                "Batch commit failed; aborting collection."
            );
            SyncError::Commit {
                collection: collection.to_string(),
                committed,
                total,
                source,
            }
        })
}
