//! # Application Configuration
//!
//! Settings for the `missao-sync` binary, resolved in layers:
//!
//! 1.  Built-in defaults (the `serde` defaults below).
//! 2.  A YAML file: `--config <FILE>` when given (it must exist), otherwise
//!     `missao-sync.yml` in the working directory if present. `${VAR}`
//!     placeholders are replaced with environment values before parsing.
//! 3.  `MISSAO_`-prefixed environment variables. Nested keys use `__`, e.g.
//!     `MISSAO_EMULATOR__FIRESTORE_PORT=8181`.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use missao_sync::store::MAX_BATCH_WRITES;
use missao_sync::{ConnectionTarget, RetryPolicy, SeedCredential};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// The configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "missao-sync.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The service-account key for the production project.
    #[serde(default = "default_credential_path")]
    pub credential_path: PathBuf,
    /// Overrides the `project_id` read from the key file.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Where snapshot files are written and discovered.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// Writes per commit, at most 500.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub emulator: EmulatorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// The operator login created by `load`.
    #[serde(default)]
    pub seed: SeedCredential,
}

fn default_credential_path() -> PathBuf {
    PathBuf::from("serviceAccountKey.json")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_batch_size() -> usize {
    MAX_BATCH_WRITES
}

/// Local emulator endpoints.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EmulatorConfig {
    pub host: String,
    pub firestore_port: u16,
    pub auth_port: u16,
    pub project_id: String,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            firestore_port: 8080,
            auth_port: 9099,
            project_id: "demo-missao".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl AppConfig {
    /// The production store.
    pub fn remote_target(&self) -> ConnectionTarget {
        ConnectionTarget::Remote {
            credential_path: self.credential_path.clone(),
            project_id: self.project_id.clone(),
        }
    }

    /// The local Firestore emulator.
    pub fn local_target(&self) -> ConnectionTarget {
        ConnectionTarget::Local {
            host: self.emulator.host.clone(),
            port: self.emulator.firestore_port,
            project_id: self.emulator.project_id.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_WRITES {
            return Err(ConfigError::Invalid(format!(
                "batch_size must be between 1 and {MAX_BATCH_WRITES}, got {}",
                self.batch_size
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.credential_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "credential_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// Reads a file and replaces `${VAR}` with the variable's value (empty if unset).
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::General(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded.into_owned()))
}

/// Loads and validates the configuration.
///
/// An explicit `config_path_override` must exist; the default file is optional.
pub fn get_config(config_path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let file_content = match config_path_override {
        Some(path) => Some(read_and_substitute(path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{}'.", path.display()))
        })?),
        None => read_and_substitute(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    if let Some(content) = file_content {
        info!(
            path = %config_path_override.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)).display(),
            "Loading configuration file."
        );
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix("MISSAO")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
