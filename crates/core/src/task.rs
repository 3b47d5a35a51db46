// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grid tasks and grid-worker identity.

use crate::blob::Blob;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Client-assigned task number, unique within its grid job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One unit of work inside a grid job: a task number plus the serialized
/// arguments the shared function is applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTask {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Blob>,
}

impl GridTask {
    pub fn new(task_id: impl Into<TaskId>, arguments: Option<Blob>) -> Self {
        Self { task_id: task_id.into(), arguments }
    }
}

/// Coordinator-minted identifier for an agent's execution context on a
/// specific grid job. Logical, not a host process id: the same worker id
/// survives across the tasks it consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridWorkerId(pub String);

impl GridWorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridWorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GridWorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GridWorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for GridWorkerId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for GridWorkerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for GridWorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
