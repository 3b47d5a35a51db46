// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mg_core::GridTask;

#[test]
fn add_job_outcome_is_snake_case() {
    let response = Response::JobAdded { outcome: AddJobOutcome::IsDuplicate };
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["outcome"], "is_duplicate");
}

#[test]
fn next_task_omits_empty_task() {
    let response = Response::NextTask { task: None, closed: true };
    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("task").is_none());
    assert_eq!(json["closed"], true);
}

#[test]
fn next_task_roundtrips_with_task() {
    let response = Response::NextTask {
        task: Some(GridTask::new(7u64, None)),
        closed: false,
    };
    let json = serde_json::to_string(&response).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn health_status_display() {
    assert_eq!(HealthStatus::Serving.to_string(), "serving");
    assert_eq!(HealthStatus::NotServing.to_string(), "not_serving");
}
