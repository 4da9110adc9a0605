use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a pipeline run.
///
/// Every variant is fatal for the stage that raised it. Non-essential failures
/// (seeding the operator login) never surface here; they are reported through
/// [`crate::seed::SeedStatus`] instead.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(
        "Service-account key not found at '{}'. Download it from the Firebase console \
         (Project settings > Service accounts > Generate new private key) and save it at that path. \
         Never commit this file.",
        path.display()
    )]
    MissingCredential { path: PathBuf },

    #[error("Service-account key at '{}' is unusable: {reason}", path.display())]
    InvalidCredential { path: PathBuf, reason: String },

    #[error(
        "No snapshot file found in '{}'. Run `missao-sync export` first or pass a snapshot path.",
        dir.display()
    )]
    SnapshotNotFound { dir: PathBuf },

    #[error("Snapshot '{}' already exists; snapshots are never overwritten.", path.display())]
    SnapshotExists { path: PathBuf },

    #[error("Failed to read snapshot '{}': {source}", path.display())]
    SnapshotUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot '{}': {source}", path.display())]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot '{}' has no '{collection}' collection.", path.display())]
    MissingCollection { path: PathBuf, collection: String },

    #[error("Failed to fetch collection '{collection}': {source}")]
    Fetch {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error(
        "Writing collection '{collection}' aborted after {committed} of {total} records were committed: {source}"
    )]
    Commit {
        collection: String,
        committed: usize,
        total: usize,
        #[source]
        source: StoreError,
    },

    #[error("Failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
