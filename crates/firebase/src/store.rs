//! # Firestore-Backed Document Store
//!
//! Implements [`DocumentStore`] on top of `firestore`, for both the production
//! database and the local Firestore emulator. Which one is used is decided by
//! the [`ConnectionTarget`] given to [`FirestoreStore::connect`]; no process
//! environment variable is read or set.

use crate::value::{document_to_record, is_native_encoding, OutboundRecord};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreDb, FirestoreDbOptions};
use missao_sync::credentials::load_service_account;
use missao_sync::merge::merge_field_paths_with;
use missao_sync::store::{DocumentStore, StoreError, WriteMode, WriteOp, MAX_BATCH_WRITES};
use missao_sync::types::{Collection, ConnectionTarget, Record};
use missao_sync::SyncError;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

pub struct FirestoreStore {
    db: FirestoreDb,
    label: String,
}

impl FirestoreStore {
    /// Connects to `target`.
    ///
    /// For a remote target the service-account key is validated first, so a
    /// missing key fails before any network call is made.
    pub async fn connect(target: &ConnectionTarget) -> Result<Self, SyncError> {
        let label = target.describe();
        let db = match target {
            ConnectionTarget::Local {
                host,
                port,
                project_id,
            } => {
                let options = FirestoreDbOptions::new(project_id.clone())
                    .with_firebase_api_url(format!("http://{host}:{port}"));
                FirestoreDb::with_options(options).await
            }
            ConnectionTarget::Remote {
                credential_path,
                project_id,
            } => {
                let key = load_service_account(credential_path, project_id.as_deref())?;
                FirestoreDb::with_options_service_account_key_file(
                    FirestoreDbOptions::new(key.project_id),
                    key.path,
                )
                .await
            }
        }
        .map_err(|e| SyncError::Connect {
            target: label.clone(),
            source: map_firestore_error(e),
        })?;

        info!(store = %label, "Connected to Firestore.");
        Ok(Self { db, label })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn fetch_collection(&self, collection: &str) -> Result<Collection, StoreError> {
        let mut stream = self
            .db
            .fluent()
            .select()
            .from(collection)
            .stream_query_with_errors()
            .await
            .map_err(map_firestore_error)?;

        let mut records = Collection::new();
        while let Some(doc) = stream.try_next().await.map_err(map_firestore_error)? {
            let (key, fields) = document_to_record(&doc);
            records.insert(key, fields);
        }
        debug!(store = %self.label, collection, records = records.len(), "Fetched collection.");
        Ok(records)
    }

    async fn commit_batch(&self, collection: &str, writes: &[WriteOp]) -> Result<(), StoreError> {
        if writes.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                size: writes.len(),
                limit: MAX_BATCH_WRITES,
            });
        }

        // A transaction commit applies every write or none of them.
        let mut transaction = self
            .db
            .begin_transaction()
            .await
            .map_err(map_firestore_error)?;

        for write in writes {
            let payload = OutboundRecord(&write.fields);
            let update = self.db.fluent().update();
            let staged = match write.mode {
                WriteMode::Overwrite => update
                    .in_col(collection)
                    .document_id(&write.key)
                    .object(&payload)
                    .add_to_transaction(&mut transaction)
                    .map(|_| ()),
                WriteMode::Merge => update
                    .fields(merge_mask(&write.fields))
                    .in_col(collection)
                    .document_id(&write.key)
                    .object(&payload)
                    .add_to_transaction(&mut transaction)
                    .map(|_| ()),
            };
            if let Err(e) = staged {
                if let Err(rollback) = transaction.rollback().await {
                    warn!(store = %self.label, collection, error = %rollback, "Rollback failed.");
                }
                return Err(map_firestore_error(e));
            }
        }

        transaction.commit().await.map_err(map_firestore_error)?;
        debug!(store = %self.label, collection, writes = writes.len(), "Committed batch.");
        Ok(())
    }
}

/// The update mask for a merge write of `fields`. Maps that encode a native
/// value are named whole.
fn merge_mask(fields: &Record) -> Vec<String> {
    merge_field_paths_with(fields, is_native_encoding)
}

/// Classifies Firestore errors for the retry policy.
fn map_firestore_error(err: FirestoreError) -> StoreError {
    match &err {
        FirestoreError::NetworkError(_) => StoreError::Unavailable(err.to_string()),
        FirestoreError::DatabaseError(db_err) if db_err.retry_possible => {
            StoreError::Unavailable(err.to_string())
        }
        FirestoreError::DatabaseError(db_err)
            if db_err.public.code.contains("PermissionDenied")
                || db_err.public.code.contains("Unauthenticated") =>
        {
            StoreError::PermissionDenied(err.to_string())
        }
        FirestoreError::SerializeError(_)
        | FirestoreError::DeserializeError(_)
        | FirestoreError::SystemError(_) => StoreError::Internal(anyhow::anyhow!("{err}")),
        _ => StoreError::Rejected(err.to_string()),
    }
}
