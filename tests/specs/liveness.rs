// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lost-agent scenarios: heartbeat timeout fails in-flight work and
//! returns capacity.

use super::helpers::{res, start_coordinator_with_heartbeat};
use mg_core::{FunctionRef, GridTask, Job, JobSpec, ProcessState};
use mg_proto::AddJobOutcome;
use std::time::Duration;

#[tokio::test]
async fn silent_agent_is_removed_and_its_task_fails() {
    let (handle, client) = start_coordinator_with_heartbeat(Duration::from_millis(300)).await;
    client.register_agent("a1".into(), res(&[("cpu", 4.0)]), None).await.unwrap();

    let job = Job::builder()
        .id("grid")
        .resources_required(res(&[("cpu", 1.0)]))
        .spec(JobSpec::Grid {
            function: FunctionRef::QualifiedName {
                module: "tasks".into(),
                function: "run".into(),
            },
        })
        .build();
    assert_eq!(client.add_job(job).await.unwrap(), AddJobOutcome::Added);
    client
        .add_tasks_to_grid_job("grid".into(), vec![GridTask::new(2u64, None)], false)
        .await
        .unwrap();

    // Worker takes task 2, then the agent goes silent for good
    let worker = client.get_next_jobs("a1".into(), None).await.unwrap()[0]
        .grid_worker_id
        .clone()
        .unwrap();
    let (task, closed) = client
        .update_grid_task_state_and_get_next("grid".into(), worker.clone(), None)
        .await
        .unwrap();
    assert_eq!(task.unwrap().task_id.value(), 2);
    assert!(!closed);

    tokio::time::sleep(Duration::from_millis(900)).await;

    // The sweep declared the agent lost: task failed, agent gone
    let tasks = client.get_grid_task_states("grid".into(), vec![]).await.unwrap();
    assert_eq!(tasks[0].report.state, ProcessState::ErrorGettingState);
    assert!(client.get_agent_states().await.unwrap().is_empty());

    // A stray worker process learns it is done the next time it asks
    let (task, closed) = client
        .update_grid_task_state_and_get_next("grid".into(), worker, None)
        .await
        .unwrap();
    assert!(task.is_none());
    assert!(closed);

    handle.stop();
}

#[tokio::test]
async fn re_registration_with_new_totals_orphans_old_work() {
    let (handle, client) = start_coordinator_with_heartbeat(Duration::from_secs(30)).await;
    client.register_agent("a1".into(), res(&[("cpu", 4.0)]), None).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let job = Job::builder()
        .id("j1")
        .resources_required(res(&[("cpu", 2.0)]))
        .code_deployment(mg_core::CodeDeployment::ServerAvailableFolder {
            paths: vec![dir.path().to_path_buf()],
        })
        .build();
    assert_eq!(client.add_job(job).await.unwrap(), AddJobOutcome::Added);
    let assigned = client.get_next_jobs("a1".into(), None).await.unwrap();
    assert_eq!(assigned.len(), 1);

    // The agent restarts with different capacity: in-flight work is lost
    client.register_agent("a1".into(), res(&[("cpu", 8.0)]), None).await.unwrap();

    let states = client.get_simple_job_states(vec!["j1".into()]).await.unwrap();
    assert_eq!(states[0].state, ProcessState::ErrorGettingState);
    let agents = client.get_agent_states().await.unwrap();
    assert_eq!(agents[0].total.get("cpu"), 8.0);
    assert_eq!(agents[0].available.get("cpu"), 8.0);

    handle.stop();
}
