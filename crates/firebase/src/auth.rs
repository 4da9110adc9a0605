//! # Auth Emulator Seeder
//!
//! Creates the operator login in the Firebase Auth emulator through its
//! Identity Toolkit REST API. The emulator grants admin access to requests
//! carrying `Authorization: Bearer owner`, which lets us pick the account's
//! uid so it stays the same across runs.

use async_trait::async_trait;
use missao_sync::seed::{CredentialSeeder, SeedCredential, SeedError, SeedOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const ADMIN_BEARER: &str = "Bearer owner";

/// Error codes meaning the account already exists.
const EXISTING_ACCOUNT_CODES: [&str; 2] = ["DUPLICATE_LOCAL_ID", "EMAIL_EXISTS"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest<'a> {
    local_id: &'a str,
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest<'a> {
    local_id: &'a str,
    password: &'a str,
    display_name: &'a str,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

pub struct AuthEmulatorSeeder {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
}

impl AuthEmulatorSeeder {
    /// A seeder for the emulator at `host:port`.
    pub fn new(host: &str, port: u16, project_id: &str) -> Result<Self, SeedError> {
        Self::with_base_url(&format!("http://{host}:{port}"), project_id)
    }

    /// A seeder for an emulator reachable at `base_url` (e.g. `http://127.0.0.1:9099`).
    pub fn with_base_url(base_url: &str, project_id: &str) -> Result<Self, SeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SeedError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
        })
    }

    fn accounts_url(&self) -> String {
        format!(
            "{}/identitytoolkit.googleapis.com/v1/projects/{}/accounts",
            self.base_url, self.project_id
        )
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), SeedError> {
        debug!(url, "Calling auth emulator.");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, ADMIN_BEARER)
            .json(body)
            .send()
            .await
            .map_err(|e| SeedError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response
            .text()
            .await
            .map_err(|e| SeedError::Unreachable(e.to_string()))?;
        match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => {
                let message = envelope.error.message;
                let code = message
                    .split(" : ")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                Err(SeedError::Rejected { code, message })
            }
            Err(_) => Err(SeedError::Unexpected(format!("HTTP {status}: {text}"))),
        }
    }

    async fn create(&self, seed: &SeedCredential) -> Result<(), SeedError> {
        let body = CreateAccountRequest {
            local_id: &seed.uid,
            email: &seed.email,
            password: &seed.password,
            display_name: &seed.display_name,
        };
        self.post(&self.accounts_url(), &body).await
    }

    async fn reset_password(&self, seed: &SeedCredential) -> Result<(), SeedError> {
        let body = UpdateAccountRequest {
            local_id: &seed.uid,
            password: &seed.password,
            display_name: &seed.display_name,
        };
        self.post(&format!("{}:update", self.accounts_url()), &body)
            .await
    }
}

#[async_trait]
impl CredentialSeeder for AuthEmulatorSeeder {
    async fn ensure(&self, seed: &SeedCredential) -> Result<SeedOutcome, SeedError> {
        match self.create(seed).await {
            Ok(()) => {
                info!(uid = %seed.uid, "Operator account created.");
                Ok(SeedOutcome::Created)
            }
            Err(SeedError::Rejected { code, .. })
                if EXISTING_ACCOUNT_CODES.contains(&code.as_str()) =>
            {
                info!(uid = %seed.uid, code = %code, "Operator account exists; resetting its password.");
                self.reset_password(seed).await?;
                Ok(SeedOutcome::PasswordReset)
            }
            Err(e) => Err(e),
        }
    }
}
