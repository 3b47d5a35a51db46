// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolution of credential references into actual secret bytes.

use async_trait::async_trait;
use mg_core::{CredentialReference, Credentials};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialFetchError {
    #[error("cannot read credential file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret manager lookup for '{name}' failed: {message}")]
    SecretLookup { name: String, message: String },

    #[error("no secret fetch command configured (MG_SECRET_FETCH_CMD)")]
    NoSecretCommand,
}

/// Turns a stored [`CredentialReference`] into secret bytes.
#[async_trait]
pub trait CredentialFetcher: Send + Sync {
    async fn fetch(
        &self,
        reference: &CredentialReference,
    ) -> Result<Credentials, CredentialFetchError>;
}

/// Production fetcher: host files are read from the coordinator disk,
/// secret-manager names go through a configurable shell command with
/// `{name}` substituted (e.g. an `aws secretsmanager get-secret-value`
/// pipeline). The command's stdout is the secret.
pub struct HostCredentialFetcher {
    secret_command: Option<String>,
}

impl HostCredentialFetcher {
    pub fn new(secret_command: Option<String>) -> Self {
        Self { secret_command }
    }

    pub fn from_env() -> Self {
        Self::new(crate::env::secret_fetch_cmd())
    }
}

#[async_trait]
impl CredentialFetcher for HostCredentialFetcher {
    async fn fetch(
        &self,
        reference: &CredentialReference,
    ) -> Result<Credentials, CredentialFetchError> {
        match reference {
            CredentialReference::HostFile { path, kind } => {
                let bytes = tokio::fs::read(path).await.map_err(|source| {
                    CredentialFetchError::File { path: path.clone(), source }
                })?;
                Ok(Credentials::new(*kind, bytes))
            }
            CredentialReference::SecretManager { name, kind } => {
                let template = self
                    .secret_command
                    .as_deref()
                    .ok_or(CredentialFetchError::NoSecretCommand)?;
                let command = template.replace("{name}", name);
                let output = tokio::process::Command::new("sh")
                    .arg("-c")
                    .arg(&command)
                    .output()
                    .await
                    .map_err(|e| CredentialFetchError::SecretLookup {
                        name: name.clone(),
                        message: e.to_string(),
                    })?;
                if !output.status.success() {
                    return Err(CredentialFetchError::SecretLookup {
                        name: name.clone(),
                        message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    });
                }
                Ok(Credentials::new(*kind, output.stdout))
            }
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
