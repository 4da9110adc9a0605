//! # Snapshot Files
//!
//! A snapshot is the full content of every tracked collection, serialized as a
//! pretty-printed JSON object `{ collection: { recordKey: fields } }`.
//!
//! Snapshot files are named `missao-backup-<YYYY-MM-DD-HHMM>.json`, so sorting
//! names as plain strings sorts them chronologically. A file is written once
//! and never touched again; writing a second snapshot within the same minute
//! fails rather than replacing the first.

use crate::errors::SyncError;
use crate::types::{Collection, TRACKED_COLLECTIONS};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const SNAPSHOT_PREFIX: &str = "missao-backup-";
pub const SNAPSHOT_EXTENSION: &str = ".json";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M";

/// The in-memory form of a snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    collections: BTreeMap<String, Collection>,
}

impl Snapshot {
    /// A snapshot holding every tracked collection, all empty.
    pub fn with_tracked_collections() -> Self {
        let collections = TRACKED_COLLECTIONS
            .iter()
            .map(|name| (name.to_string(), Collection::new()))
            .collect();
        Self { collections }
    }

    pub fn insert(&mut self, name: &str, collection: Collection) {
        self.collections.insert(name.to_string(), collection);
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Record count per collection.
    pub fn record_counts(&self) -> BTreeMap<String, usize> {
        self.collections
            .iter()
            .map(|(name, records)| (name.clone(), records.len()))
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    /// Fails with the first tracked collection the snapshot lacks, and warns
    /// about collections nobody will read.
    pub fn require_tracked_collections(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(missing) = TRACKED_COLLECTIONS
            .iter()
            .find(|name| !self.collections.contains_key(**name))
        {
            return Err(SyncError::MissingCollection {
                path: path.to_path_buf(),
                collection: missing.to_string(),
            });
        }
        for name in self.collection_names() {
            if !TRACKED_COLLECTIONS.contains(&name) {
                warn!(collection = name, "Snapshot contains an untracked collection; it will be skipped.");
            }
        }
        Ok(())
    }
}

/// Builds the snapshot filename for a point in time, truncated to the minute.
pub fn snapshot_file_name(at: &NaiveDateTime) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}{SNAPSHOT_EXTENSION}",
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Returns the timestamp encoded in a snapshot filename, or `None` if `name`
/// does not follow the naming scheme.
pub fn parse_snapshot_file_name(name: &str) -> Option<NaiveDateTime> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_EXTENSION)?;
    // Zero-padded fields only, so that string order stays chronological.
    if stamp.len() != "YYYY-MM-DD-HHMM".len() {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// Writes `snapshot` to a new file in `dir` named after `at`.
///
/// The directory is created if needed. The content goes to a temporary file
/// that only takes the snapshot name once fully written and synced, so a
/// failed write leaves no snapshot behind. An existing file with the same
/// name is never replaced.
pub fn write_snapshot(
    dir: &Path,
    snapshot: &Snapshot,
    at: &NaiveDateTime,
) -> Result<PathBuf, SyncError> {
    let path = write_new_file(dir, &snapshot_file_name(at), |writer| {
        serde_json::to_writer_pretty(&mut *writer, snapshot)?;
        writer.write_all(b"\n")
    })?;

    info!(
        path = %path.display(),
        records = snapshot.total_records(),
        "Snapshot written."
    );
    Ok(path)
}

fn write_new_file<F>(dir: &Path, file_name: &str, write: F) -> Result<PathBuf, SyncError>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
{
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    if path.exists() {
        return Err(SyncError::SnapshotExists { path });
    }

    // Dropping `tmp` on any early return deletes it.
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(&path) {
        Ok(_) => Ok(path),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            Err(SyncError::SnapshotExists { path })
        }
        Err(e) => Err(e.error.into()),
    }
}

/// Reads and parses a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SyncError> {
    let file = File::open(path).map_err(|source| SyncError::SnapshotUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SyncError::SnapshotParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Finds the newest snapshot file in `dir`.
pub fn find_latest_snapshot(dir: &Path) -> Result<PathBuf, SyncError> {
    let not_found = || SyncError::SnapshotNotFound {
        dir: dir.to_path_buf(),
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<String> = None;
    for entry in entries {
        let entry = entry?;
        // Follows symlinks, so a linked snapshot is still a candidate.
        if !entry.path().is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if parse_snapshot_file_name(&name).is_none() {
            continue;
        }
        match &newest {
            Some(current) if name <= *current => {}
            _ => newest = Some(name),
        }
    }

    let name = newest.ok_or_else(not_found)?;
    debug!(file = %name, "Selected newest snapshot.");
    Ok(dir.join(name))
}

/// Uses `explicit` when given, otherwise the newest snapshot in `dir`.
pub fn resolve_snapshot_path(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf, SyncError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => find_latest_snapshot(dir),
    }
}
