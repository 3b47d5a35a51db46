// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side connection helper.
//!
//! One request/response exchange per connection, mirroring the listener.
//! Typed wrappers unwrap the expected response variant and turn
//! `Response::Error` into [`ClientError::Rejected`].

use crate::response::{AddJobOutcome, HealthStatus};
use crate::types::{AgentStateEntry, JobToRun, TaskStateEntry};
use crate::wire::{read_response, write_request, ProtocolError};
use crate::{JobStateUpdate, Request, Response, TaskStateUpdate};
use mg_core::{
    AgentId, CredentialReference, CredentialService, GridTask, GridWorkerId, Job, JobId,
    ProcessStateReport, Resources, TaskId,
};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

/// Errors talking to the coordinator.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to coordinator at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The coordinator refused the request; nothing was changed.
    #[error("coordinator rejected request: {message}")]
    Rejected { message: String },

    #[error("unexpected response to {request}")]
    UnexpectedResponse { request: &'static str },
}

/// Connects to a coordinator address and issues one RPC per call.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    addr: String,
    timeout: Duration,
}

impl CoordinatorClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), timeout: Duration::from_secs(30) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one request and read the response.
    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = TcpStream::connect(&self.addr).await.map_err(|source| {
            ClientError::Connect { addr: self.addr.clone(), source }
        })?;
        let (mut reader, mut writer) = stream.split();
        write_request(&mut writer, request, self.timeout).await?;
        let response = read_response(&mut reader, self.timeout).await?;
        if let Response::Error { message } = response {
            return Err(ClientError::Rejected { message });
        }
        Ok(response)
    }

    pub async fn add_job(&self, job: Job) -> Result<AddJobOutcome, ClientError> {
        match self.request(&Request::AddJob { job }).await? {
            Response::JobAdded { outcome } => Ok(outcome),
            _ => Err(ClientError::UnexpectedResponse { request: "add_job" }),
        }
    }

    pub async fn add_tasks_to_grid_job(
        &self,
        job_id: JobId,
        tasks: Vec<GridTask>,
        all_tasks_added: bool,
    ) -> Result<AddJobOutcome, ClientError> {
        let request = Request::AddTasksToGridJob { job_id, tasks, all_tasks_added };
        match self.request(&request).await? {
            Response::JobAdded { outcome } => Ok(outcome),
            _ => Err(ClientError::UnexpectedResponse { request: "add_tasks_to_grid_job" }),
        }
    }

    pub async fn get_simple_job_states(
        &self,
        job_ids: Vec<JobId>,
    ) -> Result<Vec<ProcessStateReport>, ClientError> {
        match self.request(&Request::GetSimpleJobStates { job_ids }).await? {
            Response::JobStates { states } => Ok(states),
            _ => Err(ClientError::UnexpectedResponse { request: "get_simple_job_states" }),
        }
    }

    pub async fn get_grid_task_states(
        &self,
        job_id: JobId,
        ignore: Vec<TaskId>,
    ) -> Result<Vec<TaskStateEntry>, ClientError> {
        match self.request(&Request::GetGridTaskStates { job_id, ignore }).await? {
            Response::TaskStates { states } => Ok(states),
            _ => Err(ClientError::UnexpectedResponse { request: "get_grid_task_states" }),
        }
    }

    pub async fn add_credentials(
        &self,
        service: CredentialService,
        service_url: impl Into<String>,
        reference: CredentialReference,
    ) -> Result<(), ClientError> {
        let request = Request::AddCredentials {
            service,
            service_url: service_url.into(),
            reference,
        };
        match self.request(&request).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse { request: "add_credentials" }),
        }
    }

    pub async fn get_agent_states(&self) -> Result<Vec<AgentStateEntry>, ClientError> {
        match self.request(&Request::GetAgentStates).await? {
            Response::AgentStates { agents } => Ok(agents),
            _ => Err(ClientError::UnexpectedResponse { request: "get_agent_states" }),
        }
    }

    pub async fn register_agent(
        &self,
        agent_id: AgentId,
        resources: Resources,
        job_id: Option<JobId>,
    ) -> Result<(), ClientError> {
        let request = Request::RegisterAgent { agent_id, resources, job_id };
        match self.request(&request).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse { request: "register_agent" }),
        }
    }

    pub async fn get_next_jobs(
        &self,
        agent_id: AgentId,
        job_id: Option<JobId>,
    ) -> Result<Vec<JobToRun>, ClientError> {
        match self.request(&Request::GetNextJobs { agent_id, job_id }).await? {
            Response::JobsToRun { jobs } => Ok(jobs),
            _ => Err(ClientError::UnexpectedResponse { request: "get_next_jobs" }),
        }
    }

    pub async fn update_job_states(
        &self,
        agent_id: AgentId,
        updates: Vec<JobStateUpdate>,
    ) -> Result<(), ClientError> {
        match self.request(&Request::UpdateJobStates { agent_id, updates }).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse { request: "update_job_states" }),
        }
    }

    /// Returns `(task, closed)`: no task and `closed` means the worker is
    /// done; no task on an open queue means "ask again shortly".
    pub async fn update_grid_task_state_and_get_next(
        &self,
        job_id: JobId,
        grid_worker_id: GridWorkerId,
        completed: Option<TaskStateUpdate>,
    ) -> Result<(Option<GridTask>, bool), ClientError> {
        let request = Request::UpdateGridTaskStateAndGetNext { job_id, grid_worker_id, completed };
        match self.request(&request).await? {
            Response::NextTask { task, closed } => Ok((task, closed)),
            _ => Err(ClientError::UnexpectedResponse {
                request: "update_grid_task_state_and_get_next",
            }),
        }
    }

    pub async fn check(&self, service: impl Into<String>) -> Result<HealthStatus, ClientError> {
        match self.request(&Request::Check { service: service.into() }).await? {
            Response::Health { status } => Ok(status),
            _ => Err(ClientError::UnexpectedResponse { request: "check" }),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.request(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            _ => Err(ClientError::UnexpectedResponse { request: "shutdown" }),
        }
    }
}
