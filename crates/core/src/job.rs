// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable job model.
//!
//! A job is fixed at submission: identity, priority, how the agent obtains
//! code and interpreter, what to execute, and what resources it needs. The
//! coordinator stores it verbatim (after resolving branch/tag deployments to
//! concrete commits/digests) and never mutates it afterwards.

use crate::blob::Blob;
use crate::resources::{ResourceError, Resources};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Client-chosen job identifier.
///
/// Restricted to letters, digits, `.`, `-`, and `_` so it can be embedded in
/// log file names and deployment cache paths without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Charset check; enforced when a job is admitted.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for JobId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for JobId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How the agent obtains the code to run. Exactly one variant per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeDeployment {
    /// Paths that already exist on the agent host. The first path is the
    /// working directory; all paths join the interpreter search path.
    ServerAvailableFolder { paths: Vec<PathBuf> },
    /// A git repository pinned to a commit. Reruns are deterministic.
    GitRepoCommit {
        url: String,
        commit: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path_to_source: Option<String>,
    },
    /// A git branch; the coordinator resolves it to a commit at submission
    /// so the stored job never holds a moving reference.
    GitRepoBranch {
        url: String,
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path_to_source: Option<String>,
    },
}

/// How the agent obtains the interpreter. Exactly one variant per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterpreterDeployment {
    /// An interpreter binary that already exists on the agent host.
    ServerAvailableInterpreter { path: PathBuf },
    /// A container image pinned to a digest.
    ContainerAtDigest { repository: String, digest: String },
    /// A container tag; resolved to a digest at submission, like branches.
    ContainerAtTag { repository: String, tag: String },
    /// An image already present on the agent host.
    ServerAvailableContainer { image_id: String },
}

/// A reference to a remote function, either by importable name or as a
/// runtime-serialized object the coordinator never inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FunctionRef {
    QualifiedName { module: String, function: String },
    Pickled { blob: Blob },
}

/// What the job executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSpec {
    /// A command line run as-is in the deployed environment.
    Command {
        command_line: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_variables: Option<Blob>,
    },
    /// A single remote function call.
    Function {
        function: FunctionRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments: Option<Blob>,
    },
    /// A shared function applied to a bag of tasks added separately.
    Grid { function: FunctionRef },
}

impl JobSpec {
    pub fn is_grid(&self) -> bool {
        matches!(self, JobSpec::Grid { .. })
    }
}

/// An immutable request to execute a command, a function, or a grid of
/// tasks on an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Friendly display name; no charset restriction.
    pub name: String,
    /// Relative scheduling weight. Must be positive and finite.
    pub priority: f64,
    /// Percentage threshold for interruptible capacity; 0 means the job
    /// only runs on on-demand agents.
    #[serde(default)]
    pub interruption_probability_threshold: f64,
    pub code_deployment: CodeDeployment,
    pub interpreter_deployment: InterpreterDeployment,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub resources_required: Resources,
    /// Highest serialization protocol the submitting runtime can read back.
    #[serde(default)]
    pub result_highest_pickle_protocol: i32,
    pub spec: JobSpec,
}

/// Rejection reasons for a submitted job, surfaced synchronously on the
/// submitting RPC before any state changes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error("invalid job id '{id}': only letters, digits, '.', '-', '_' are allowed")]
    InvalidId { id: String },

    #[error("job '{id}': priority must be positive and finite (got {priority})")]
    InvalidPriority { id: String, priority: f64 },

    #[error("job '{id}': interruption probability threshold must be in 0..=100 (got {value})")]
    InvalidInterruptionThreshold { id: String, value: f64 },

    #[error("job '{id}': {source}")]
    Resource {
        id: String,
        #[source]
        source: ResourceError,
    },
}

impl Job {
    /// Validate everything checkable without I/O. The deployment oneofs of
    /// the wire contract are structural here: the closed sums cannot encode
    /// zero or two variants.
    pub fn validate(&self) -> Result<(), JobError> {
        if !self.id.is_valid() {
            return Err(JobError::InvalidId { id: self.id.to_string() });
        }
        if !self.priority.is_finite() || self.priority <= 0.0 {
            return Err(JobError::InvalidPriority {
                id: self.id.to_string(),
                priority: self.priority,
            });
        }
        let threshold = self.interruption_probability_threshold;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(JobError::InvalidInterruptionThreshold {
                id: self.id.to_string(),
                value: threshold,
            });
        }
        self.resources_required
            .validate()
            .map_err(|source| JobError::Resource { id: self.id.to_string(), source })?;
        Ok(())
    }

    pub fn is_grid(&self) -> bool {
        self.spec.is_grid()
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        id: JobId = JobId::new("job-1"),
        name: String = String::from("test-job"),
        priority: f64 = 1.0,
        interruption_probability_threshold: f64 = 0.0,
        code_deployment: CodeDeployment = CodeDeployment::ServerAvailableFolder {
            paths: vec![std::path::PathBuf::from("/tmp/code")],
        },
        interpreter_deployment: InterpreterDeployment =
            InterpreterDeployment::ServerAvailableInterpreter {
                path: std::path::PathBuf::from("/usr/bin/python3"),
            },
        environment_variables: HashMap<String, String> = HashMap::new(),
        resources_required: Resources = Resources::new(),
        result_highest_pickle_protocol: i32 = 5,
        spec: JobSpec = JobSpec::Command {
            command_line: vec!["true".to_string()],
            context_variables: None,
        },
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
