// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mg_core::{GridTask, Job, JobSpec, ProcessState, ProcessStateReport, Resources};
use mg_proto::AddJobOutcome;

mod credentials;
mod jobs;
mod ledger;
mod tasks;

pub(crate) fn res(pairs: &[(&str, f64)]) -> Resources {
    pairs.iter().map(|(n, v)| (*n, *v)).collect()
}

pub(crate) fn grid_job(id: &str) -> Job {
    Job::builder()
        .id(id)
        .spec(JobSpec::Grid {
            function: mg_core::FunctionRef::QualifiedName {
                module: "tasks".into(),
                function: "run".into(),
            },
        })
        .build()
}

pub(crate) fn added(state: &mut GridState, job: Job) {
    assert_eq!(state.add_job(job, 1_000).unwrap(), AddJobOutcome::Added);
}

pub(crate) fn task(id: u64) -> GridTask {
    GridTask::new(id, None)
}

pub(crate) fn report(state: ProcessState) -> ProcessStateReport {
    ProcessStateReport::new(state)
}
