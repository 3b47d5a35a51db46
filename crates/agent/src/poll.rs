// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent control loop: register once, poll for work, launch children,
//! report state transitions. The loop itself never blocks on a child;
//! every assignment runs on its own task.

use crate::deploy;
use crate::exec::{self, LaunchRequest};
use mg_core::{AgentId, Blob, GridWorkerId, JobId, ProcessState, ProcessStateReport, Resources};
use mg_proto::{ClientError, CoordinatorClient, JobStateUpdate, JobToRun};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub coordinator_addr: String,
    pub agent_id: AgentId,
    pub resources: Resources,
    /// Serve only this job (job-specific agents).
    pub job_affinity: Option<JobId>,
    /// Root for deployment caches, job scratch dirs, and logs.
    pub working_dir: PathBuf,
    pub poll_interval: Duration,
}

/// A worker host: registers with the coordinator and runs assignments.
pub struct Agent {
    config: AgentConfig,
    client: Arc<CoordinatorClient>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        let client = Arc::new(CoordinatorClient::new(config.coordinator_addr.clone()));
        Self { config, client }
    }

    /// Register, then poll until cancelled. Registration failure is fatal;
    /// poll failures are retried at the poll cadence (the coordinator may
    /// simply be restarting).
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ClientError> {
        self.client
            .register_agent(
                self.config.agent_id.clone(),
                self.config.resources.clone(),
                self.config.job_affinity.clone(),
            )
            .await?;
        info!(
            agent_id = %self.config.agent_id,
            resources = %self.config.resources,
            "registered with coordinator"
        );

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self
                .client
                .get_next_jobs(self.config.agent_id.clone(), self.config.job_affinity.clone())
                .await
            {
                Ok(jobs) => {
                    for assignment in jobs {
                        let client = Arc::clone(&self.client);
                        let config = self.config.clone();
                        tokio::spawn(async move {
                            run_assignment(client, config, assignment).await;
                        });
                    }
                }
                Err(e) => warn!("poll failed: {}", e),
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}

/// Resolve deployments, launch, and report states for one assignment.
async fn run_assignment(client: Arc<CoordinatorClient>, config: AgentConfig, work: JobToRun) {
    let job_id = work.job.id.clone();
    let worker_id = work.grid_worker_id.clone();
    info!(job_id = %job_id, worker = ?worker_id, "starting assignment");

    let code = match deploy::resolve_code(
        &work.job.code_deployment,
        &config.working_dir,
        work.code_credentials.as_ref(),
    )
    .await
    {
        Ok(code) => code,
        Err(e) => {
            report_launch_failure(&client, &config, &job_id, &worker_id, e.to_string()).await;
            return;
        }
    };
    let interpreter = match deploy::resolve_interpreter(
        &work.job.interpreter_deployment,
        work.interpreter_credentials.as_ref(),
    )
    .await
    {
        Ok(interpreter) => interpreter,
        Err(e) => {
            report_launch_failure(&client, &config, &job_id, &worker_id, e.to_string()).await;
            return;
        }
    };

    let scratch_name = match &worker_id {
        Some(worker) => format!("{}-{}", job_id, worker),
        None => job_id.to_string(),
    };
    let request = LaunchRequest {
        job: work.job,
        grid_worker_id: worker_id.clone(),
        code,
        interpreter,
        coordinator_addr: config.coordinator_addr.clone(),
        job_dir: config.working_dir.join("jobs").join(scratch_name),
    };

    let execution = match exec::launch(&request).await {
        Ok(execution) => execution,
        Err(e) => {
            report_launch_failure(&client, &config, &job_id, &worker_id, e.to_string()).await;
            return;
        }
    };
    send_report(&client, &config, &job_id, &worker_id, execution.running.clone()).await;

    let terminal = exec::wait(execution).await;
    info!(job_id = %job_id, state = %terminal.state, "assignment finished");
    send_report(&client, &config, &job_id, &worker_id, terminal).await;
}

async fn report_launch_failure(
    client: &CoordinatorClient,
    config: &AgentConfig,
    job_id: &JobId,
    worker_id: &Option<GridWorkerId>,
    message: String,
) {
    warn!(job_id = %job_id, "launch failed: {}", message);
    let report = ProcessStateReport::new(ProcessState::RunRequestFailed)
        .exception(Blob::new(message.into_bytes()));
    send_report(client, config, job_id, worker_id, report).await;
}

async fn send_report(
    client: &CoordinatorClient,
    config: &AgentConfig,
    job_id: &JobId,
    worker_id: &Option<GridWorkerId>,
    report: ProcessStateReport,
) {
    let update = JobStateUpdate {
        job_id: job_id.clone(),
        grid_worker_id: worker_id.clone(),
        report,
    };
    if let Err(e) = client.update_job_states(config.agent_id.clone(), vec![update]).await {
        // Nothing sensible to do locally; the coordinator's heartbeat
        // timeout covers the case where this keeps failing.
        warn!(job_id = %job_id, "state report failed: {}", e);
    }
}
