// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential material managed on behalf of jobs.
//!
//! Clients register a credential *source* for a (service, URL prefix) pair;
//! the coordinator resolves the source at dispatch time and hands the actual
//! bytes to the agent alongside the job. This is payload plumbing, not peer
//! authentication.

use crate::blob::Blob;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which kind of remote the credentials authenticate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialService {
    Docker,
    Git,
}

crate::display_names! {
    CredentialService {
        Docker => "docker",
        Git => "git",
    }
}

/// Shape of the secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    UsernamePassword,
    SshKey,
}

crate::display_names! {
    CredentialKind {
        UsernamePassword => "username_password",
        SshKey => "ssh_key",
    }
}

/// Where the secret material lives. Resolution happens on the coordinator
/// host at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialReference {
    /// A named entry in an external secret manager.
    SecretManager { name: String, kind: CredentialKind },
    /// A file on the coordinator host.
    HostFile { path: PathBuf, kind: CredentialKind },
}

impl CredentialReference {
    pub fn kind(&self) -> CredentialKind {
        match self {
            CredentialReference::SecretManager { kind, .. } => *kind,
            CredentialReference::HostFile { kind, .. } => *kind,
        }
    }
}

/// Resolved secret bytes, tagged with their shape. Forwarded to agents,
/// never logged.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub kind: CredentialKind,
    pub data: Blob,
}

impl Credentials {
    pub fn new(kind: CredentialKind, data: impl Into<Blob>) -> Self {
        Self { kind, data: data.into() }
    }
}

// Keep secret bytes out of Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials({}, {} bytes)", self.kind, self.data.len())
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
