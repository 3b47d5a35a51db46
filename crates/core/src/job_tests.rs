// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "job1", true },
    dotted = { "etl.daily-2026_07", true },
    empty = { "", false },
    space = { "job 1", false },
    slash = { "job/1", false },
    unicode = { "jöb", false },
)]
fn job_id_charset(id: &str, valid: bool) {
    assert_eq!(JobId::new(id).is_valid(), valid);
}

#[test]
fn default_builder_job_validates() {
    assert!(Job::builder().build().validate().is_ok());
}

#[test]
fn rejects_bad_id() {
    let job = Job::builder().id("has space").build();
    assert!(matches!(job.validate(), Err(JobError::InvalidId { .. })));
}

#[parameterized(
    zero = { 0.0 },
    negative = { -2.0 },
    nan = { f64::NAN },
    infinite = { f64::INFINITY },
)]
fn rejects_bad_priority(priority: f64) {
    let job = Job::builder().priority(priority).build();
    assert!(matches!(job.validate(), Err(JobError::InvalidPriority { .. })));
}

#[test]
fn rejects_out_of_range_interruption_threshold() {
    let job = Job::builder().interruption_probability_threshold(101.0).build();
    assert!(matches!(job.validate(), Err(JobError::InvalidInterruptionThreshold { .. })));
}

#[test]
fn rejects_negative_resources() {
    let job = Job::builder()
        .resources_required([("cpu", -1.0)].into_iter().collect::<Resources>())
        .build();
    assert!(matches!(job.validate(), Err(JobError::Resource { .. })));
}

#[test]
fn grid_spec_is_detected() {
    let job = Job::builder()
        .spec(JobSpec::Grid {
            function: FunctionRef::QualifiedName {
                module: "tasks".into(),
                function: "run".into(),
            },
        })
        .build();
    assert!(job.is_grid());
    assert!(!Job::builder().build().is_grid());
}

#[test]
fn job_roundtrips_through_json() {
    let job = Job::builder()
        .code_deployment(CodeDeployment::GitRepoCommit {
            url: "https://example.com/repo.git".into(),
            commit: "0123abcd".into(),
            path_to_source: Some("src".into()),
        })
        .interpreter_deployment(InterpreterDeployment::ContainerAtDigest {
            repository: "example/worker".into(),
            digest: "sha256:feed".into(),
        })
        .spec(JobSpec::Function {
            function: FunctionRef::Pickled { blob: Blob::new(b"fn".as_slice()) },
            arguments: Some(Blob::new(b"args".as_slice())),
        })
        .build();
    let json = serde_json::to_string(&job).unwrap();
    let back: Job = serde_json::from_str(&json).unwrap();
    assert_eq!(back, job);
}

#[test]
fn deployment_tags_are_snake_case() {
    let dep = CodeDeployment::GitRepoBranch {
        url: "u".into(),
        branch: "main".into(),
        path_to_source: None,
    };
    let json = serde_json::to_value(&dep).unwrap();
    assert_eq!(json["type"], "git_repo_branch");
}
