// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler-level tests driving the full request dispatch without sockets.

use super::*;
use crate::adapters::{CommandDeploymentResolver, HostCredentialFetcher};
use crate::state::GridState;
use mg_core::{
    CodeDeployment, CredentialKind, CredentialReference, CredentialService, FakeClock, GridTask,
    Job, JobSpec, ProcessState, ProcessStateReport,
};
use mg_proto::{AddJobOutcome, HealthStatus, JobStateUpdate, Request, Response, TaskStateUpdate};
use rand::SeedableRng;

fn test_ctx() -> ListenCtx<FakeClock> {
    ListenCtx {
        state: Arc::new(Mutex::new(GridState::new())),
        rng: Mutex::new(StdRng::seed_from_u64(1)),
        resolver: Arc::new(CommandDeploymentResolver),
        fetcher: Arc::new(HostCredentialFetcher::new(None)),
        clock: FakeClock::new(),
        wake: Arc::new(Notify::new()),
        shutdown: Arc::new(Notify::new()),
        shutting_down: AtomicBool::new(false),
    }
}

async fn send<C: Clock>(ctx: &ListenCtx<C>, request: Request) -> Response {
    handle_request(request, ctx).await
}

fn folder_job(id: &str) -> Job {
    Job::builder().id(id).build()
}

fn grid_job(id: &str) -> Job {
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

async fn register<C: Clock>(ctx: &ListenCtx<C>, agent: &str, cpu: f64) {
    let response = send(
        ctx,
        Request::RegisterAgent {
            agent_id: agent.into(),
            resources: [("cpu", cpu)].into_iter().collect(),
            job_id: None,
        },
    )
    .await;
    assert_eq!(response, Response::Ok);
}

// ── Basics ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_pongs() {
    let ctx = test_ctx();
    assert_eq!(send(&ctx, Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn hello_reports_version() {
    let ctx = test_ctx();
    match send(&ctx, Request::Hello { version: "0.0.1".into() }).await {
        Response::Hello { version } => assert_eq!(version, mg_proto::PROTOCOL_VERSION),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn check_flips_on_shutdown() {
    let ctx = test_ctx();
    assert_eq!(
        send(&ctx, Request::Check { service: String::new() }).await,
        Response::Health { status: HealthStatus::Serving }
    );
    assert_eq!(send(&ctx, Request::Shutdown).await, Response::ShuttingDown);
    assert_eq!(
        send(&ctx, Request::Check { service: String::new() }).await,
        Response::Health { status: HealthStatus::NotServing }
    );
}

// ── Submission ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_job_then_duplicate() {
    let ctx = test_ctx();
    let added = send(&ctx, Request::AddJob { job: folder_job("j1") }).await;
    assert_eq!(added, Response::JobAdded { outcome: AddJobOutcome::Added });

    let duplicate = send(&ctx, Request::AddJob { job: folder_job("j1") }).await;
    assert_eq!(duplicate, Response::JobAdded { outcome: AddJobOutcome::IsDuplicate });
}

#[tokio::test]
async fn invalid_job_is_rejected_synchronously() {
    let ctx = test_ctx();
    let response = send(&ctx, Request::AddJob { job: folder_job("bad id") }).await;
    assert!(matches!(response, Response::Error { .. }));
    assert_eq!(
        send(&ctx, Request::GetSimpleJobStates { job_ids: vec!["bad id".into()] }).await,
        Response::JobStates {
            states: vec![ProcessStateReport::new(ProcessState::Unknown)]
        }
    );
}

#[tokio::test]
async fn unknown_ids_read_unknown() {
    let ctx = test_ctx();
    match send(&ctx, Request::GetSimpleJobStates { job_ids: vec!["ghost".into()] }).await {
        Response::JobStates { states } => {
            assert_eq!(states[0].state, ProcessState::Unknown);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

// ── Assignment and state reporting ───────────────────────────────────────────

#[tokio::test]
async fn poll_assigns_and_updates_round_trip() {
    let ctx = test_ctx();
    register(&ctx, "a1", 4.0).await;
    send(&ctx, Request::AddJob { job: folder_job("j1") }).await;

    let jobs = match send(
        &ctx,
        Request::GetNextJobs { agent_id: "a1".into(), job_id: None },
    )
    .await
    {
        Response::JobsToRun { jobs } => jobs,
        other => panic!("unexpected: {:?}", other),
    };
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job.id, "j1");
    assert!(jobs[0].grid_worker_id.is_none());

    // Running, then succeeded; the reservation comes back
    for state in [ProcessState::Running, ProcessState::Succeeded] {
        let response = send(
            &ctx,
            Request::UpdateJobStates {
                agent_id: "a1".into(),
                updates: vec![JobStateUpdate {
                    job_id: "j1".into(),
                    grid_worker_id: None,
                    report: ProcessStateReport::new(state),
                }],
            },
        )
        .await;
        assert_eq!(response, Response::Ok);
    }

    match send(&ctx, Request::GetAgentStates).await {
        Response::AgentStates { agents } => {
            assert_eq!(agents[0].available.get("cpu"), 4.0);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn unregistered_agent_cannot_poll() {
    let ctx = test_ctx();
    let response =
        send(&ctx, Request::GetNextJobs { agent_id: "ghost".into(), job_id: None }).await;
    assert!(matches!(response, Response::Error { .. }));
}

// ── Grid flow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn grid_worker_drains_queue_to_closed_marker() {
    let ctx = test_ctx();
    register(&ctx, "a1", 4.0).await;
    send(&ctx, Request::AddJob { job: grid_job("g") }).await;
    send(
        &ctx,
        Request::AddTasksToGridJob {
            job_id: "g".into(),
            tasks: vec![GridTask::new(0u64, None), GridTask::new(1u64, None)],
            all_tasks_added: true,
        },
    )
    .await;

    let jobs = match send(
        &ctx,
        Request::GetNextJobs { agent_id: "a1".into(), job_id: None },
    )
    .await
    {
        Response::JobsToRun { jobs } => jobs,
        other => panic!("unexpected: {:?}", other),
    };
    let worker_id = jobs[0].grid_worker_id.clone().unwrap();

    // First pull: no completed task yet
    let mut completed = None;
    let mut seen = Vec::new();
    loop {
        let response = send(
            &ctx,
            Request::UpdateGridTaskStateAndGetNext {
                job_id: "g".into(),
                grid_worker_id: worker_id.clone(),
                completed: completed.take(),
            },
        )
        .await;
        match response {
            Response::NextTask { task: Some(task), closed: false } => {
                seen.push(task.task_id.value());
                completed = Some(TaskStateUpdate {
                    task_id: task.task_id,
                    report: ProcessStateReport::new(ProcessState::Succeeded),
                });
            }
            Response::NextTask { task: None, closed: true } => break,
            other => panic!("unexpected: {:?}", other),
        }
    }
    assert_eq!(seen, vec![0, 1]);

    // Queue drained, worker gone: aggregate reads succeeded and the
    // reservation is back
    match send(&ctx, Request::GetSimpleJobStates { job_ids: vec!["g".into()] }).await {
        Response::JobStates { states } => {
            assert_eq!(states[0].state, ProcessState::Succeeded);
        }
        other => panic!("unexpected: {:?}", other),
    }
    match send(&ctx, Request::GetAgentStates).await {
        Response::AgentStates { agents } => {
            assert_eq!(agents[0].available.get("cpu"), 4.0);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn append_after_close_is_an_error() {
    let ctx = test_ctx();
    send(&ctx, Request::AddJob { job: grid_job("g") }).await;
    send(
        &ctx,
        Request::AddTasksToGridJob {
            job_id: "g".into(),
            tasks: vec![GridTask::new(0u64, None)],
            all_tasks_added: true,
        },
    )
    .await;
    let response = send(
        &ctx,
        Request::AddTasksToGridJob {
            job_id: "g".into(),
            tasks: vec![GridTask::new(1u64, None)],
            all_tasks_added: false,
        },
    )
    .await;
    assert!(matches!(response, Response::Error { .. }));
}

// ── Credentials ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn git_job_carries_resolved_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("deploy.key");
    std::fs::write(&key_path, b"-----KEY-----").unwrap();

    let ctx = test_ctx();
    register(&ctx, "a1", 4.0).await;
    let response = send(
        &ctx,
        Request::AddCredentials {
            service: CredentialService::Git,
            service_url: "https://example.com/".into(),
            reference: CredentialReference::HostFile {
                path: key_path,
                kind: CredentialKind::SshKey,
            },
        },
    )
    .await;
    assert_eq!(response, Response::Ok);

    let job = Job::builder()
        .id("git-job")
        .code_deployment(CodeDeployment::GitRepoCommit {
            url: "https://example.com/repo.git".into(),
            commit: "abc123".into(),
            path_to_source: None,
        })
        .build();
    send(&ctx, Request::AddJob { job }).await;

    match send(&ctx, Request::GetNextJobs { agent_id: "a1".into(), job_id: None }).await {
        Response::JobsToRun { jobs } => {
            let credentials = jobs[0].code_credentials.as_ref().unwrap();
            assert_eq!(credentials.kind, CredentialKind::SshKey);
            assert_eq!(credentials.data.as_bytes(), b"-----KEY-----");
            assert!(jobs[0].interpreter_credentials.is_none());
        }
        other => panic!("unexpected: {:?}", other),
    }
}
