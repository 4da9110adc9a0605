//! Core data types shared by every stage of the pipeline.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The collections carried by every export, load and reconcile run.
///
/// The order here is the order in which stages process them.
pub const TRACKED_COLLECTIONS: [&str; 9] = [
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

/// A single document's fields. Contents are never interpreted by the pipeline.
pub type Record = Map<String, Value>;

/// All records of one collection, keyed by record key.
pub type Collection = BTreeMap<String, Record>;

/// Where a store lives.
///
/// Stages receive an already-connected store; this value is what the store
/// constructors consume, so two stages can talk to different targets inside
/// one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// A local emulator reachable without network credentials.
    Local {
        host: String,
        port: u16,
        project_id: String,
    },
    /// The production store, authenticated with a service-account key file.
    Remote {
        credential_path: PathBuf,
        /// Overrides the `project_id` found in the key file.
        project_id: Option<String>,
    },
}

impl ConnectionTarget {
    /// A short human-readable label used in logs and progress lines.
    pub fn describe(&self) -> String {
        match self {
            ConnectionTarget::Local { host, port, .. } => format!("emulator at {host}:{port}"),
            ConnectionTarget::Remote {
                credential_path, ..
            } => format!("remote store ({})", credential_path.display()),
        }
    }
}
