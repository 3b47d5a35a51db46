// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment resolution on the agent host.
//!
//! Code arrives as in-place folders or pinned git commits; interpreters as
//! host binaries or pinned container images. Git checkouts are cached under
//! the agent's working directory keyed by (url, commit), so reruns of the
//! same pinned deployment cost nothing.

use mg_core::{CodeDeployment, CredentialKind, Credentials, InterpreterDeployment};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("code deployment has no paths")]
    EmptyFolderList,

    #[error("code folder {0} does not exist on this host")]
    MissingFolder(PathBuf),

    #[error("git clone of {url} failed: {message}")]
    GitClone { url: String, message: String },

    #[error("container pull of {image} failed: {message}")]
    ContainerPull { image: String, message: String },

    // The coordinator pins branches and tags at submission; seeing one
    // here means it skipped that step.
    #[error("deployment reference was not pinned by the coordinator")]
    UnpinnedReference,

    #[error("I/O error during deployment: {0}")]
    Io(#[from] std::io::Error),
}

/// Code ready to execute: a working directory plus every path that joins
/// the interpreter search path (and the container mounts).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCode {
    pub working_dir: PathBuf,
    pub code_paths: Vec<PathBuf>,
}

/// An interpreter ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInterpreter {
    /// Binary on the agent host.
    Host { path: PathBuf },
    /// Image name/reference the local container runtime can run.
    Container { image: String },
}

/// Materialize a code deployment under `cache_dir`.
pub async fn resolve_code(
    deployment: &CodeDeployment,
    cache_dir: &Path,
    credentials: Option<&Credentials>,
) -> Result<ResolvedCode, DeployError> {
    match deployment {
        CodeDeployment::ServerAvailableFolder { paths } => {
            let first = paths.first().ok_or(DeployError::EmptyFolderList)?;
            if !first.exists() {
                return Err(DeployError::MissingFolder(first.clone()));
            }
            Ok(ResolvedCode { working_dir: first.clone(), code_paths: paths.clone() })
        }
        CodeDeployment::GitRepoCommit { url, commit, path_to_source } => {
            let checkout = git_checkout(url, commit, cache_dir, credentials).await?;
            let working_dir = match path_to_source {
                Some(sub) => checkout.join(sub),
                None => checkout,
            };
            Ok(ResolvedCode { working_dir: working_dir.clone(), code_paths: vec![working_dir] })
        }
        CodeDeployment::GitRepoBranch { .. } => Err(DeployError::UnpinnedReference),
    }
}

/// Materialize an interpreter deployment.
pub async fn resolve_interpreter(
    deployment: &InterpreterDeployment,
    credentials: Option<&Credentials>,
) -> Result<ResolvedInterpreter, DeployError> {
    match deployment {
        InterpreterDeployment::ServerAvailableInterpreter { path } => {
            Ok(ResolvedInterpreter::Host { path: path.clone() })
        }
        InterpreterDeployment::ServerAvailableContainer { image_id } => {
            Ok(ResolvedInterpreter::Container { image: image_id.clone() })
        }
        InterpreterDeployment::ContainerAtDigest { repository, digest } => {
            let image = format!("{}@{}", repository, digest);
            pull_image(&image, repository, credentials).await?;
            Ok(ResolvedInterpreter::Container { image })
        }
        InterpreterDeployment::ContainerAtTag { .. } => Err(DeployError::UnpinnedReference),
    }
}

/// Clone-or-reuse a pinned commit. The cache key is (url, commit): a cache
/// hit never touches the network, which is what makes pinned reruns
/// deterministic.
async fn git_checkout(
    url: &str,
    commit: &str,
    cache_dir: &Path,
    credentials: Option<&Credentials>,
) -> Result<PathBuf, DeployError> {
    let checkout = cache_dir.join("git").join(sanitize(url)).join(commit);
    if checkout.join(".git").exists() {
        debug!(%url, commit, "reusing cached checkout");
        return Ok(checkout);
    }
    if let Some(parent) = checkout.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let err = |message: String| DeployError::GitClone { url: url.to_string(), message };
    let (clone_url, ssh_command) = git_auth(url, credentials, cache_dir).await?;

    let mut clone = Command::new("git");
    clone.arg("clone").arg(&clone_url).arg(&checkout);
    if let Some(ssh) = ssh_command.as_deref() {
        clone.env("GIT_SSH_COMMAND", ssh);
    }
    let output = tokio::time::timeout(crate::env::deploy_timeout(), clone.output())
        .await
        .map_err(|_| err("clone timed out".to_string()))?
        .map_err(|e| err(e.to_string()))?;
    if !output.status.success() {
        return Err(err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }

    let output = Command::new("git")
        .arg("-C")
        .arg(&checkout)
        .arg("checkout")
        .arg("--detach")
        .arg(commit)
        .output()
        .await
        .map_err(|e| err(e.to_string()))?;
    if !output.status.success() {
        return Err(err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    info!(%url, commit, "checked out");
    Ok(checkout)
}

/// Work credentials into the clone: username/password lands in the URL,
/// an SSH key becomes a `GIT_SSH_COMMAND` pointing at a key file.
async fn git_auth(
    url: &str,
    credentials: Option<&Credentials>,
    cache_dir: &Path,
) -> Result<(String, Option<String>), DeployError> {
    let Some(credentials) = credentials else {
        return Ok((url.to_string(), None));
    };
    match credentials.kind {
        CredentialKind::UsernamePassword => {
            let userinfo = String::from_utf8_lossy(credentials.data.as_bytes()).trim().to_string();
            let with_auth = match url.split_once("://") {
                Some((scheme, rest)) => format!("{}://{}@{}", scheme, userinfo, rest),
                None => url.to_string(),
            };
            Ok((with_auth, None))
        }
        CredentialKind::SshKey => {
            let keys_dir = cache_dir.join("keys");
            tokio::fs::create_dir_all(&keys_dir).await?;
            let key_path = keys_dir.join(format!("key-{}", nanoid::nanoid!(8)));
            tokio::fs::write(&key_path, credentials.data.as_bytes()).await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))
                    .await?;
            }
            let ssh = format!(
                "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
                key_path.display()
            );
            Ok((url.to_string(), Some(ssh)))
        }
    }
}

async fn pull_image(
    image: &str,
    repository: &str,
    credentials: Option<&Credentials>,
) -> Result<(), DeployError> {
    let err = |message: String| DeployError::ContainerPull {
        image: image.to_string(),
        message,
    };
    if let Some(credentials) = credentials {
        if credentials.kind == CredentialKind::UsernamePassword {
            let raw = String::from_utf8_lossy(credentials.data.as_bytes()).trim().to_string();
            if let Some((user, password)) = raw.split_once(':') {
                let registry = repository.split('/').next().unwrap_or(repository);
                let mut login = Command::new("docker")
                    .arg("login")
                    .arg(registry)
                    .arg("-u")
                    .arg(user)
                    .arg("--password-stdin")
                    .stdin(std::process::Stdio::piped())
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::piped())
                    .spawn()
                    .map_err(|e| err(e.to_string()))?;
                if let Some(mut stdin) = login.stdin.take() {
                    use tokio::io::AsyncWriteExt;
                    stdin.write_all(password.as_bytes()).await?;
                }
                let status = login.wait().await.map_err(|e| err(e.to_string()))?;
                if !status.success() {
                    return Err(err("docker login failed".to_string()));
                }
            }
        }
    }
    let output = tokio::time::timeout(
        crate::env::deploy_timeout(),
        Command::new("docker").arg("pull").arg(image).output(),
    )
    .await
    .map_err(|_| err("pull timed out".to_string()))?
    .map_err(|e| err(e.to_string()))?;
    if !output.status.success() {
        return Err(err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    info!(%image, "pulled");
    Ok(())
}

fn sanitize(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
