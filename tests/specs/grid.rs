// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grid-job scenarios. The "runtime workers" here are scripted clients
//! speaking the task protocol directly, standing in for the interpreter
//! processes a real deployment would launch.

use super::helpers::{res, start_coordinator, wait_for_state};
use mg_core::{FunctionRef, GridTask, GridWorkerId, Job, JobSpec, ProcessState, ProcessStateReport};
use mg_proto::{AddJobOutcome, CoordinatorClient, TaskStateUpdate};
use std::time::Duration;

fn grid_job(id: &str) -> Job {
    Job::builder()
        .id(id)
        .resources_required(res(&[("cpu", 1.0)]))
        .spec(JobSpec::Grid {
            function: FunctionRef::QualifiedName {
                module: "tasks".into(),
                function: "run".into(),
            },
        })
        .build()
}

fn task(id: u64) -> GridTask {
    GridTask::new(id, Some(mg_core::Blob::new(format!("args-{}", id).into_bytes())))
}

async fn pull(
    client: &CoordinatorClient,
    job: &str,
    worker: &GridWorkerId,
    finished: Option<u64>,
) -> (Option<u64>, bool) {
    let completed = finished.map(|task_id| TaskStateUpdate {
        task_id: task_id.into(),
        report: ProcessStateReport::new(ProcessState::Succeeded),
    });
    let (next, closed) = client
        .update_grid_task_state_and_get_next(job.into(), worker.clone(), completed)
        .await
        .unwrap();
    (next.map(|t| t.task_id.value()), closed)
}

#[tokio::test]
async fn two_workers_drain_ordered_tasks_and_late_append() {
    let (handle, client) = start_coordinator().await;
    client.register_agent("a1".into(), res(&[("cpu", 4.0)]), None).await.unwrap();
    client.register_agent("a2".into(), res(&[("cpu", 4.0)]), None).await.unwrap();

    assert_eq!(client.add_job(grid_job("grid")).await.unwrap(), AddJobOutcome::Added);
    client
        .add_tasks_to_grid_job("grid".into(), vec![task(1), task(2), task(3)], false)
        .await
        .unwrap();

    // One worker per agent
    let w1 = client.get_next_jobs("a1".into(), None).await.unwrap()[0]
        .grid_worker_id
        .clone()
        .unwrap();
    let w2 = client.get_next_jobs("a2".into(), None).await.unwrap()[0]
        .grid_worker_id
        .clone()
        .unwrap();
    assert_ne!(w1, w2);
    assert!(client.get_next_jobs("a1".into(), None).await.unwrap().is_empty());

    // Tasks come out in insertion order, never twice
    let (first, closed) = pull(&client, "grid", &w1, None).await;
    assert_eq!((first, closed), (Some(1), false));
    let (second, _) = pull(&client, "grid", &w2, None).await;
    assert_eq!(second, Some(2));
    let (third, _) = pull(&client, "grid", &w1, Some(1)).await;
    assert_eq!(third, Some(3));

    // Queue is empty but still open: workers wait, they are not dismissed
    let (none, closed) = pull(&client, "grid", &w2, Some(2)).await;
    assert_eq!((none, closed), (None, false));

    // Late append, then the close latch
    client.add_tasks_to_grid_job("grid".into(), vec![task(4)], true).await.unwrap();
    let (fourth, closed) = pull(&client, "grid", &w2, None).await;
    assert_eq!((fourth, closed), (Some(4), false));

    // Drained and closed: both workers get the exit marker
    let (none, closed) = pull(&client, "grid", &w1, Some(3)).await;
    assert_eq!((none, closed), (None, true));
    let (none, closed) = pull(&client, "grid", &w2, Some(4)).await;
    assert_eq!((none, closed), (None, true));

    // Aggregate settles to succeeded, capacity is whole again
    wait_for_state(&client, "grid", ProcessState::Succeeded, Duration::from_secs(5)).await;
    for agent in client.get_agent_states().await.unwrap() {
        assert_eq!(agent.available.get("cpu"), 4.0);
    }

    // Incremental polling with a growing ignore set
    let all = client.get_grid_task_states("grid".into(), vec![]).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|e| e.report.state == ProcessState::Succeeded));
    let rest = client
        .get_grid_task_states("grid".into(), vec![1u64.into(), 2u64.into()])
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);

    handle.stop();
}

#[tokio::test]
async fn failed_task_decides_the_aggregate() {
    let (handle, client) = start_coordinator().await;
    client.register_agent("a1".into(), res(&[("cpu", 4.0)]), None).await.unwrap();

    assert_eq!(client.add_job(grid_job("grid")).await.unwrap(), AddJobOutcome::Added);
    client
        .add_tasks_to_grid_job("grid".into(), vec![task(1), task(2)], true)
        .await
        .unwrap();
    let worker = client.get_next_jobs("a1".into(), None).await.unwrap()[0]
        .grid_worker_id
        .clone()
        .unwrap();

    let (next, _) = pull(&client, "grid", &worker, None).await;
    assert_eq!(next, Some(1));
    // Task 1 blows up in the runtime
    let completed = TaskStateUpdate {
        task_id: 1u64.into(),
        report: ProcessStateReport::new(ProcessState::PythonException)
            .exception(mg_core::Blob::new(b"traceback".as_slice())),
    };
    let (next, _) = client
        .update_grid_task_state_and_get_next("grid".into(), worker.clone(), Some(completed))
        .await
        .unwrap();
    assert_eq!(next.unwrap().task_id.value(), 2);

    // While the worker lives the aggregate stays running
    let states = client.get_simple_job_states(vec!["grid".into()]).await.unwrap();
    assert_eq!(states[0].state, ProcessState::Running);

    let (none, closed) = pull(&client, "grid", &worker, Some(2)).await;
    assert_eq!((none, closed), (None, true));

    wait_for_state(&client, "grid", ProcessState::PythonException, Duration::from_secs(5)).await;

    // Per-task detail keeps both outcomes
    let all = client.get_grid_task_states("grid".into(), vec![]).await.unwrap();
    assert_eq!(all[0].report.state, ProcessState::PythonException);
    assert_eq!(all[1].report.state, ProcessState::Succeeded);

    handle.stop();
}
