//! # Document Store Seam
//!
//! The stages only ever need two things from a store: read a whole collection,
//! and commit a bounded batch of writes to one collection. Anything that can do
//! both (Firestore, the Firestore emulator, an in-memory map) implements
//! [`DocumentStore`].

use crate::types::{Collection, Record};
use async_trait::async_trait;
use thiserror::Error;

/// The hard ceiling on operations in one committed batch.
pub const MAX_BATCH_WRITES: usize = 500;

/// Errors reported by a [`DocumentStore`] implementation.
///
/// Implementations map their backend errors into these variants so the
/// pipeline can decide uniformly whether a failure is worth retrying.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("The store could not be reached: {0}")]
    Unavailable(String),

    #[error("The store denied access: {0}")]
    PermissionDenied(String),

    #[error("A batch of {size} writes exceeds the ceiling of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("The store rejected the operation: {0}")]
    Rejected(String),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// How a write treats the document already stored under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the stored document entirely.
    Overwrite,
    /// Apply the incoming fields on top of the stored document, recursing into
    /// nested maps; stored fields absent from the incoming record survive.
    Merge,
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub key: String,
    pub fields: Record,
    pub mode: WriteMode,
}

/// A store the pipeline can read from and write to.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads every record of `collection`, exhausting any pagination.
    ///
    /// A collection that does not exist yields an empty map.
    async fn fetch_collection(&self, collection: &str) -> Result<Collection, StoreError>;

    /// Commits `writes` to `collection` as one atomic batch.
    ///
    /// Callers never pass more than [`MAX_BATCH_WRITES`] operations.
    async fn commit_batch(&self, collection: &str, writes: &[WriteOp]) -> Result<(), StoreError>;
}
