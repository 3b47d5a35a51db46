// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Branch and tag pinning at submission time.
//!
//! Stored jobs never hold a moving reference: a git branch becomes the
//! commit it points at right now, a container tag becomes its digest. The
//! failure of either surfaces synchronously on the submitting RPC.

use async_trait::async_trait;
use mg_core::{CodeDeployment, InterpreterDeployment, Job};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve branch '{branch}' of {url}: {message}")]
    GitBranch { url: String, branch: String, message: String },

    #[error("cannot resolve tag '{tag}' of {repository}: {message}")]
    ContainerTag { repository: String, tag: String, message: String },
}

/// Resolves moving deployment references to pinned ones.
#[async_trait]
pub trait DeploymentResolver: Send + Sync {
    async fn resolve_branch(&self, url: &str, branch: &str) -> Result<String, ResolveError>;
    async fn resolve_tag(&self, repository: &str, tag: &str) -> Result<String, ResolveError>;
}

/// Pin a job's deployments. Jobs already carrying commits or digests pass
/// through untouched.
pub async fn resolve_job_deployments(
    resolver: &dyn DeploymentResolver,
    mut job: Job,
) -> Result<Job, ResolveError> {
    if let CodeDeployment::GitRepoBranch { url, branch, path_to_source } = job.code_deployment {
        let commit = resolver.resolve_branch(&url, &branch).await?;
        info!(job_id = %job.id, branch = %branch, commit = %commit, "pinned git branch");
        job.code_deployment = CodeDeployment::GitRepoCommit { url, commit, path_to_source };
    }
    if let InterpreterDeployment::ContainerAtTag { repository, tag } = job.interpreter_deployment
    {
        let digest = resolver.resolve_tag(&repository, &tag).await?;
        info!(job_id = %job.id, tag = %tag, digest = %digest, "pinned container tag");
        job.interpreter_deployment =
            InterpreterDeployment::ContainerAtDigest { repository, digest };
    }
    Ok(job)
}

/// Production resolver shelling out to `git ls-remote` and
/// `docker manifest inspect`.
pub struct CommandDeploymentResolver;

#[async_trait]
impl DeploymentResolver for CommandDeploymentResolver {
    async fn resolve_branch(&self, url: &str, branch: &str) -> Result<String, ResolveError> {
        let err = |message: String| ResolveError::GitBranch {
            url: url.to_string(),
            branch: branch.to_string(),
            message,
        };
        let output = tokio::process::Command::new("git")
            .arg("ls-remote")
            .arg(url)
            .arg(format!("refs/heads/{}", branch))
            .output()
            .await
            .map_err(|e| err(e.to_string()))?;
        if !output.status.success() {
            return Err(err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .split_whitespace()
            .next()
            .filter(|commit| !commit.is_empty())
            .map(str::to_string)
            .ok_or_else(|| err("branch not found".to_string()))
    }

    async fn resolve_tag(&self, repository: &str, tag: &str) -> Result<String, ResolveError> {
        let err = |message: String| ResolveError::ContainerTag {
            repository: repository.to_string(),
            tag: tag.to_string(),
            message,
        };
        let output = tokio::process::Command::new("docker")
            .arg("manifest")
            .arg("inspect")
            .arg("--verbose")
            .arg(format!("{}:{}", repository, tag))
            .output()
            .await
            .map_err(|e| err(e.to_string()))?;
        if !output.status.success() {
            return Err(err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| err(e.to_string()))?;
        // Single-platform manifests are an object, multi-platform a list;
        // the descriptor digest is what `docker pull repo@digest` accepts.
        let digest = value
            .pointer("/Descriptor/digest")
            .or_else(|| value.pointer("/0/Descriptor/digest"))
            .and_then(|d| d.as_str());
        digest.map(str::to_string).ok_or_else(|| err("no digest in manifest".to_string()))
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
