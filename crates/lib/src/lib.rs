//! # Offline Mission Sync
//!
//! This crate moves the charity's record collections between the production
//! document store and a local emulator used during field missions. It provides
//! three stages, each an independent batch job:
//!
//! 1.  **Export** ([`export::export_snapshot`]): copies every tracked collection
//!     from a store into a new, timestamped snapshot file.
//! 2.  **Load** ([`load::load_snapshot`]): resets a (local) store to the contents
//!     of a snapshot and seeds an operator login.
//! 3.  **Reconcile** ([`reconcile::reconcile`]): backs up the local store to a
//!     new snapshot and merges every record into the remote store.
//!
//! Stores are reached through the [`store::DocumentStore`] trait, so the stages
//! never know whether they talk to Firestore, the emulator, or an in-memory
//! double.

pub mod batch;
pub mod credentials;
pub mod errors;
pub mod export;
pub mod load;
pub mod merge;
pub mod reconcile;
pub mod retry;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod types;

pub use errors::SyncError;
pub use export::{export_snapshot, ExportOptions, ExportReport};
pub use load::{load_snapshot, LoadOptions, LoadReport};
pub use reconcile::{reconcile, ReconcileOptions, ReconcileReport};
pub use retry::RetryPolicy;
pub use seed::{CredentialSeeder, SeedCredential, SeedError, SeedOutcome, SeedStatus};
pub use snapshot::Snapshot;
pub use store::{DocumentStore, StoreError, WriteMode, WriteOp};
pub use types::{Collection, ConnectionTarget, Record, TRACKED_COLLECTIONS};
