// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-grid job scenarios, driven by a real agent running real commands.

use super::helpers::{res, start_coordinator, wait_for_state, wait_for_terminal};
use mg_agent::{Agent, AgentConfig};
use mg_core::{CodeDeployment, Job, JobSpec, ProcessState, Resources};
use mg_proto::AddJobOutcome;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn spawn_agent(coordinator: String, agent_id: &str, resources: Resources, dir: &Path) -> CancellationToken {
    let config = AgentConfig {
        coordinator_addr: coordinator,
        agent_id: agent_id.into(),
        resources,
        job_affinity: None,
        working_dir: dir.to_path_buf(),
        poll_interval: Duration::from_millis(50),
    };
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        Agent::new(config).run(token).await.expect("agent loop failed");
    });
    cancel
}

fn command_job(id: &str, folder: &Path, resources: Resources, command: &[&str]) -> Job {
    Job::builder()
        .id(id)
        .resources_required(resources)
        .code_deployment(CodeDeployment::ServerAvailableFolder {
            paths: vec![folder.to_path_buf()],
        })
        .spec(JobSpec::Command {
            command_line: command.iter().map(|s| s.to_string()).collect(),
            context_variables: None,
        })
        .build()
}

#[tokio::test]
async fn single_job_runs_to_success_and_releases_resources() {
    let (handle, client) = start_coordinator().await;
    let dir = tempfile::tempdir().unwrap();
    let cancel = spawn_agent(
        handle.local_addr().to_string(),
        "agent-1",
        res(&[("cpu", 4.0)]),
        dir.path(),
    );

    let job = command_job("j1", dir.path(), res(&[("cpu", 2.0)]), &["sh", "-c", "true"]);
    assert_eq!(client.add_job(job).await.unwrap(), AddJobOutcome::Added);

    let report = wait_for_terminal(&client, "j1", Duration::from_secs(10)).await;
    assert_eq!(report.state, ProcessState::Succeeded);
    assert_eq!(report.return_code, Some(0));
    assert!(report.log_file_name.is_some());

    // The terminal update released the reservation before it was visible
    let agents = client.get_agent_states().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].available.get("cpu"), 4.0);

    cancel.cancel();
    handle.stop();
}

#[tokio::test]
async fn equal_demand_jobs_run_serialized() {
    let (handle, client) = start_coordinator().await;
    let dir = tempfile::tempdir().unwrap();
    let cancel = spawn_agent(
        handle.local_addr().to_string(),
        "agent-1",
        res(&[("cpu", 4.0)]),
        dir.path(),
    );

    for id in ["j1", "j2"] {
        let script = format!(
            "date +%s%N > {dir}/{id}.start; sleep 0.3; date +%s%N > {dir}/{id}.end",
            dir = dir.path().display(),
            id = id
        );
        let job = command_job(id, dir.path(), res(&[("cpu", 4.0)]), &["sh", "-c", &script]);
        assert_eq!(client.add_job(job).await.unwrap(), AddJobOutcome::Added);
    }

    for id in ["j1", "j2"] {
        let report = wait_for_terminal(&client, id, Duration::from_secs(15)).await;
        assert_eq!(report.state, ProcessState::Succeeded, "{} failed", id);
    }

    // Whole-agent jobs cannot have overlapped: their run intervals are
    // disjoint.
    let stamp = |name: &str| -> u128 {
        std::fs::read_to_string(dir.path().join(name))
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    };
    let (s1, e1) = (stamp("j1.start"), stamp("j1.end"));
    let (s2, e2) = (stamp("j2.start"), stamp("j2.end"));
    let overlap = s1 < e2 && s2 < e1;
    assert!(!overlap, "jobs overlapped: j1=[{},{}] j2=[{},{}]", s1, e1, s2, e2);

    let agents = client.get_agent_states().await.unwrap();
    assert_eq!(agents[0].available.get("cpu"), 4.0);

    cancel.cancel();
    handle.stop();
}

#[tokio::test]
async fn infeasible_demand_goes_terminal_on_next_tick() {
    let (handle, client) = start_coordinator().await;
    client
        .register_agent("small-1".into(), res(&[("memory", 50.0)]), None)
        .await
        .unwrap();
    client
        .register_agent("small-2".into(), res(&[("memory", 30.0)]), None)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let job = command_job("huge", dir.path(), res(&[("memory", 100.0)]), &["sh", "-c", "true"]);
    assert_eq!(client.add_job(job).await.unwrap(), AddJobOutcome::Added);

    wait_for_state(
        &client,
        "huge",
        ProcessState::ResourcesNotAvailable,
        Duration::from_secs(5),
    )
    .await;
    handle.stop();
}

#[tokio::test]
async fn resubmitting_a_finished_job_is_a_no_op() {
    let (handle, client) = start_coordinator().await;
    let dir = tempfile::tempdir().unwrap();
    let cancel = spawn_agent(
        handle.local_addr().to_string(),
        "agent-1",
        res(&[("cpu", 4.0)]),
        dir.path(),
    );

    let marker = dir.path().join("marker");
    let script = format!("echo ran >> {}", marker.display());
    let job = command_job("j1", dir.path(), res(&[("cpu", 1.0)]), &["sh", "-c", &script]);
    assert_eq!(client.add_job(job.clone()).await.unwrap(), AddJobOutcome::Added);
    let report = wait_for_terminal(&client, "j1", Duration::from_secs(10)).await;
    assert_eq!(report.state, ProcessState::Succeeded);

    // Same id again: duplicate, no second execution
    assert_eq!(client.add_job(job).await.unwrap(), AddJobOutcome::IsDuplicate);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let runs = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(runs.lines().count(), 1);
    let report = wait_for_terminal(&client, "j1", Duration::from_secs(1)).await;
    assert_eq!(report.state, ProcessState::Succeeded);

    cancel.cancel();
    handle.stop();
}
