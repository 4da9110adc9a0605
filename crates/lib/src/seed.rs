//! # Operator Login Seeding
//!
//! The field team cannot reach the production identity provider, so the
//! loader creates one fixed login in the local auth emulator. The login is
//! reproducible across runs: if it already exists its password is reset to
//! the fixed value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// The fixed operator identity created in the local auth emulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedCredential {
    pub uid: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl Default for SeedCredential {
    fn default() -> Self {
        Self {
            uid: "operador-missao".to_string(),
            email: "operador@missao.local".to_string(),
            password: "missao-offline".to_string(),
            display_name: "Operador de Missão".to_string(),
        }
    }
}

/// Errors raised while seeding the login.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("The auth emulator could not be reached: {0}")]
    Unreachable(String),

    #[error("The auth emulator rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Unexpected auth emulator response: {0}")]
    Unexpected(String),
}

/// What happened to the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    PasswordReset,
}

/// How seeding ended, as reported by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    Seeded(SeedOutcome),
    /// Seeding failed; the data load still counts as successful.
    Failed(String),
    /// No seeder was configured for this run.
    Skipped,
}

/// Something that can create or refresh the operator login.
#[async_trait]
pub trait CredentialSeeder: Send + Sync {
    /// Creates `seed`, or resets its password if an account with the same
    /// identity already exists.
    async fn ensure(&self, seed: &SeedCredential) -> Result<SeedOutcome, SeedError>;
}

/// Runs `seeder`, downgrading any failure to a warning.
pub async fn seed_operator(
    seeder: Option<&dyn CredentialSeeder>,
    seed: &SeedCredential,
) -> SeedStatus {
    let Some(seeder) = seeder else {
        return SeedStatus::Skipped;
    };
    match seeder.ensure(seed).await {
        Ok(outcome) => {
            info!(uid = %seed.uid, email = %seed.email, ?outcome, "Operator login ready.");
            SeedStatus::Seeded(outcome)
        }
        Err(e) => {
            warn!(uid = %seed.uid, error = %e, "Could not seed the operator login; continuing.");
            SeedStatus::Failed(e.to_string())
        }
    }
}
