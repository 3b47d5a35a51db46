// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mg_core::Job;

struct PinningResolver;

#[async_trait]
impl DeploymentResolver for PinningResolver {
    async fn resolve_branch(&self, _url: &str, branch: &str) -> Result<String, ResolveError> {
        Ok(format!("commit-of-{}", branch))
    }

    async fn resolve_tag(&self, _repository: &str, tag: &str) -> Result<String, ResolveError> {
        Ok(format!("sha256:digest-of-{}", tag))
    }
}

struct FailingResolver;

#[async_trait]
impl DeploymentResolver for FailingResolver {
    async fn resolve_branch(&self, url: &str, branch: &str) -> Result<String, ResolveError> {
        Err(ResolveError::GitBranch {
            url: url.into(),
            branch: branch.into(),
            message: "remote unreachable".into(),
        })
    }

    async fn resolve_tag(&self, repository: &str, tag: &str) -> Result<String, ResolveError> {
        Err(ResolveError::ContainerTag {
            repository: repository.into(),
            tag: tag.into(),
            message: "registry unreachable".into(),
        })
    }
}

#[tokio::test]
async fn branch_becomes_commit() {
    let job = Job::builder()
        .code_deployment(CodeDeployment::GitRepoBranch {
            url: "https://example.com/repo.git".into(),
            branch: "main".into(),
            path_to_source: Some("src".into()),
        })
        .build();

    let resolved = resolve_job_deployments(&PinningResolver, job).await.unwrap();
    match resolved.code_deployment {
        CodeDeployment::GitRepoCommit { url, commit, path_to_source } => {
            assert_eq!(url, "https://example.com/repo.git");
            assert_eq!(commit, "commit-of-main");
            assert_eq!(path_to_source.as_deref(), Some("src"));
        }
        other => panic!("expected pinned commit, got {:?}", other),
    }
}

#[tokio::test]
async fn tag_becomes_digest() {
    let job = Job::builder()
        .interpreter_deployment(InterpreterDeployment::ContainerAtTag {
            repository: "example/worker".into(),
            tag: "3.11".into(),
        })
        .build();

    let resolved = resolve_job_deployments(&PinningResolver, job).await.unwrap();
    match resolved.interpreter_deployment {
        InterpreterDeployment::ContainerAtDigest { repository, digest } => {
            assert_eq!(repository, "example/worker");
            assert_eq!(digest, "sha256:digest-of-3.11");
        }
        other => panic!("expected pinned digest, got {:?}", other),
    }
}

#[tokio::test]
async fn pinned_deployments_pass_through() {
    let job = Job::builder()
        .code_deployment(CodeDeployment::GitRepoCommit {
            url: "u".into(),
            commit: "abc".into(),
            path_to_source: None,
        })
        .build();

    // A resolver that always fails proves it is never consulted.
    let resolved = resolve_job_deployments(&FailingResolver, job.clone()).await.unwrap();
    assert_eq!(resolved, job);
}

#[tokio::test]
async fn resolution_failure_propagates() {
    let job = Job::builder()
        .code_deployment(CodeDeployment::GitRepoBranch {
            url: "u".into(),
            branch: "main".into(),
            path_to_source: None,
        })
        .build();

    let err = resolve_job_deployments(&FailingResolver, job).await.unwrap_err();
    assert!(matches!(err, ResolveError::GitBranch { .. }));
}
