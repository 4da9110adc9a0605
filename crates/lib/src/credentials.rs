//! Service-account key checks done before any remote call.

use crate::errors::SyncError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// The parts of a Google service-account key file the pipeline looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountKey {
    pub path: PathBuf,
    pub project_id: String,
    pub client_email: Option<String>,
}

#[derive(Deserialize)]
struct KeyFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    project_id: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
}

/// Loads and sanity-checks the key file at `path`.
///
/// `project_override` takes precedence over the file's `project_id`.
pub fn load_service_account(
    path: &Path,
    project_override: Option<&str>,
) -> Result<ServiceAccountKey, SyncError> {
    if !path.is_file() {
        return Err(SyncError::MissingCredential {
            path: path.to_path_buf(),
        });
    }

    let invalid = |reason: String| SyncError::InvalidCredential {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let key: KeyFile =
        serde_json::from_str(&content).map_err(|e| invalid(format!("not valid JSON: {e}")))?;

    if key.kind.as_deref() != Some("service_account") {
        return Err(invalid("\"type\" is not \"service_account\"".to_string()));
    }
    if key.private_key.as_deref().map_or(true, str::is_empty) {
        return Err(invalid("\"private_key\" is missing".to_string()));
    }

    let project_id = match project_override {
        Some(id) => id.to_string(),
        None => key
            .project_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                invalid(
                    "\"project_id\" is missing; set `project_id` in the configuration".to_string(),
                )
            })?,
    };

    info!(path = %path.display(), project_id = %project_id, "Service-account key loaded.");
    Ok(ServiceAccountKey {
        path: path.to_path_buf(),
        project_id,
        client_email: key.client_email,
    })
}
