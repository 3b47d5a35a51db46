// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process and container execution.
//!
//! The agent launches exactly one child per assignment: the command line
//! itself for command jobs, or the deployed interpreter running the
//! runtime-side worker entrypoint for function and grid jobs. Payload
//! exchange with that runtime happens through files in the job scratch
//! directory, named by the `MEADOWGRID_*` environment contract; the agent
//! forwards their bytes without interpreting them.

use crate::deploy::{ResolvedCode, ResolvedInterpreter};
use mg_core::{Blob, FunctionRef, GridWorkerId, Job, JobSpec, ProcessState, ProcessStateReport};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub const ENV_COORDINATOR: &str = "MEADOWGRID_COORDINATOR";
pub const ENV_JOB_ID: &str = "MEADOWGRID_JOB_ID";
pub const ENV_GRID_WORKER_ID: &str = "MEADOWGRID_GRID_WORKER_ID";
pub const ENV_FUNCTION_MODULE: &str = "MEADOWGRID_FUNCTION_MODULE";
pub const ENV_FUNCTION_NAME: &str = "MEADOWGRID_FUNCTION_NAME";
pub const ENV_FUNCTION_FILE: &str = "MEADOWGRID_FUNCTION_FILE";
pub const ENV_ARGUMENTS_FILE: &str = "MEADOWGRID_ARGUMENTS_FILE";
pub const ENV_RESULT_FILE: &str = "MEADOWGRID_RESULT_FILE";
pub const ENV_EXCEPTION_FILE: &str = "MEADOWGRID_EXCEPTION_FILE";
pub const ENV_PICKLE_PROTOCOL: &str = "MEADOWGRID_RESULT_PICKLE_PROTOCOL";

/// Runtime-side entrypoint for function and grid jobs.
pub const WORKER_MODULE: &str = "meadowgrid.worker";

/// Where code paths appear inside containers: `/meadowgrid/code0`, `…1`, …
pub const CONTAINER_CODE_PREFIX: &str = "/meadowgrid/code";
/// Where the job scratch directory appears inside containers.
pub const CONTAINER_IO_DIR: &str = "/meadowgrid/io";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command job has an empty command line")]
    EmptyCommand,

    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error("failed to start container: {0}")]
    ContainerStart(String),

    #[error("I/O error preparing launch: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to start one assignment.
pub struct LaunchRequest {
    pub job: Job,
    pub grid_worker_id: Option<GridWorkerId>,
    pub code: ResolvedCode,
    pub interpreter: ResolvedInterpreter,
    pub coordinator_addr: String,
    /// Scratch directory unique to this (job, worker): io files and log.
    pub job_dir: PathBuf,
}

/// A started child plus the paths its terminal report is read from.
#[derive(Debug)]
pub struct Execution {
    /// The `running` report to send upstream (pid or container id, log).
    pub running: ProcessStateReport,
    handle: ExecHandle,
    result_file: PathBuf,
    exception_file: PathBuf,
    log_file: PathBuf,
}

#[derive(Debug)]
enum ExecHandle {
    Process(Child),
    Container { id: String },
}

/// Start the assignment's child process or container.
pub async fn launch(request: &LaunchRequest) -> Result<Execution, LaunchError> {
    tokio::fs::create_dir_all(&request.job_dir).await?;
    let result_file = request.job_dir.join("result.pkl");
    let exception_file = request.job_dir.join("exception.pkl");
    let arguments_file = request.job_dir.join("arguments.pkl");
    let log_file = request.job_dir.join(format!("{}.log", request.job.id));

    if let JobSpec::Function { arguments: Some(blob), .. } = &request.job.spec {
        tokio::fs::write(&arguments_file, blob.as_bytes()).await?;
    }
    if let JobSpec::Command { context_variables: Some(blob), .. } = &request.job.spec {
        tokio::fs::write(request.job_dir.join("context.pkl"), blob.as_bytes()).await?;
    }
    if let JobSpec::Function { function: FunctionRef::Pickled { blob }, .. }
    | JobSpec::Grid { function: FunctionRef::Pickled { blob } } = &request.job.spec
    {
        tokio::fs::write(request.job_dir.join("function.pkl"), blob.as_bytes()).await?;
    }

    let run_in_container = matches!(request.interpreter, ResolvedInterpreter::Container { .. });
    let io_dir = if run_in_container {
        PathBuf::from(CONTAINER_IO_DIR)
    } else {
        request.job_dir.clone()
    };

    let mut env: Vec<(String, String)> = request
        .job
        .environment_variables
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    env.push((ENV_COORDINATOR.into(), request.coordinator_addr.clone()));
    env.push((ENV_JOB_ID.into(), request.job.id.to_string()));
    if let Some(worker_id) = &request.grid_worker_id {
        env.push((ENV_GRID_WORKER_ID.into(), worker_id.to_string()));
    }
    env.push((ENV_RESULT_FILE.into(), io_dir.join("result.pkl").display().to_string()));
    env.push((ENV_EXCEPTION_FILE.into(), io_dir.join("exception.pkl").display().to_string()));
    env.push((
        ENV_PICKLE_PROTOCOL.into(),
        request.job.result_highest_pickle_protocol.to_string(),
    ));
    match &request.job.spec {
        JobSpec::Function { function, arguments } => {
            if arguments.is_some() {
                env.push((
                    ENV_ARGUMENTS_FILE.into(),
                    io_dir.join("arguments.pkl").display().to_string(),
                ));
            }
            push_function_env(&mut env, function, &io_dir);
        }
        JobSpec::Grid { function } => push_function_env(&mut env, function, &io_dir),
        JobSpec::Command { .. } => {}
    }

    match &request.interpreter {
        ResolvedInterpreter::Host { path } => {
            launch_process(request, path, env, result_file, exception_file, log_file)
        }
        ResolvedInterpreter::Container { image } => {
            launch_container(request, image, env, result_file, exception_file, log_file).await
        }
    }
}

fn push_function_env(env: &mut Vec<(String, String)>, function: &FunctionRef, io_dir: &Path) {
    match function {
        FunctionRef::QualifiedName { module, function } => {
            env.push((ENV_FUNCTION_MODULE.into(), module.clone()));
            env.push((ENV_FUNCTION_NAME.into(), function.clone()));
        }
        FunctionRef::Pickled { .. } => {
            env.push((
                ENV_FUNCTION_FILE.into(),
                io_dir.join("function.pkl").display().to_string(),
            ));
        }
    }
}

fn search_path(paths: &[PathBuf]) -> String {
    let mut joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    if let Ok(existing) = std::env::var("PYTHONPATH") {
        if !existing.is_empty() {
            joined.push(existing);
        }
    }
    joined.join(":")
}

fn launch_process(
    request: &LaunchRequest,
    interpreter: &Path,
    mut env: Vec<(String, String)>,
    result_file: PathBuf,
    exception_file: PathBuf,
    log_file: PathBuf,
) -> Result<Execution, LaunchError> {
    let (program, args): (String, Vec<String>) = match &request.job.spec {
        JobSpec::Command { command_line, .. } => {
            let mut parts = command_line.clone();
            if parts.is_empty() {
                return Err(LaunchError::EmptyCommand);
            }
            let program = parts.remove(0);
            (program, parts)
        }
        JobSpec::Function { .. } | JobSpec::Grid { .. } => (
            interpreter.display().to_string(),
            vec!["-m".to_string(), WORKER_MODULE.to_string()],
        ),
    };
    env.push(("PYTHONPATH".into(), search_path(&request.code.code_paths)));

    let log = std::fs::File::create(&log_file)?;
    let mut command = Command::new(&program);
    command
        .args(&args)
        .current_dir(&request.code.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log));
    for (key, value) in &env {
        command.env(key, value);
    }

    let child = command.spawn().map_err(|e| LaunchError::Spawn(e.to_string()))?;
    debug!(job_id = %request.job.id, pid = child.id(), program = %program, "process started");
    let mut running = ProcessStateReport::new(ProcessState::Running)
        .log_file_name(log_file.display().to_string());
    if let Some(pid) = child.id() {
        running = running.pid(pid);
    }
    Ok(Execution {
        running,
        handle: ExecHandle::Process(child),
        result_file,
        exception_file,
        log_file,
    })
}

async fn launch_container(
    request: &LaunchRequest,
    image: &str,
    env: Vec<(String, String)>,
    result_file: PathBuf,
    exception_file: PathBuf,
    log_file: PathBuf,
) -> Result<Execution, LaunchError> {
    let err = |message: String| LaunchError::ContainerStart(message);

    let mut command = Command::new("docker");
    command.arg("run").arg("-d");
    let mut container_paths = Vec::new();
    for (idx, path) in request.code.code_paths.iter().enumerate() {
        let target = format!("{}{}", CONTAINER_CODE_PREFIX, idx);
        command.arg("-v").arg(format!("{}:{}:ro", path.display(), target));
        container_paths.push(PathBuf::from(target));
    }
    command.arg("-v").arg(format!("{}:{}", request.job_dir.display(), CONTAINER_IO_DIR));
    let workdir = container_paths
        .first()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| CONTAINER_IO_DIR.to_string());
    command.arg("-w").arg(&workdir);
    for (key, value) in &env {
        command.arg("-e").arg(format!("{}={}", key, value));
    }
    command.arg("-e").arg(format!("PYTHONPATH={}", search_path(&container_paths)));
    command.arg(image);
    match &request.job.spec {
        JobSpec::Command { command_line, .. } => {
            if command_line.is_empty() {
                return Err(LaunchError::EmptyCommand);
            }
            command.args(command_line);
        }
        JobSpec::Function { .. } | JobSpec::Grid { .. } => {
            command.args(["python", "-m", WORKER_MODULE]);
        }
    }

    let output = command.output().await.map_err(|e| err(e.to_string()))?;
    if !output.status.success() {
        return Err(err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if container_id.is_empty() {
        return Err(err("no container id from docker run".to_string()));
    }
    debug!(job_id = %request.job.id, container = %container_id, "container started");
    let running = ProcessStateReport::new(ProcessState::Running)
        .container_id(container_id.clone())
        .log_file_name(log_file.display().to_string());
    Ok(Execution {
        running,
        handle: ExecHandle::Container { id: container_id },
        result_file,
        exception_file,
        log_file,
    })
}

/// Wait for the child to finish and classify the outcome. Failures to
/// observe the child map to `error_getting_state`, never to a panic.
pub async fn wait(execution: Execution) -> ProcessStateReport {
    let return_code = match execution.handle {
        ExecHandle::Process(mut child) => match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("could not wait for child: {}", e);
                return ProcessStateReport::new(ProcessState::ErrorGettingState)
                    .log_file_name(execution.log_file.display().to_string());
            }
        },
        ExecHandle::Container { id } => match wait_container(&id, &execution.log_file).await {
            Ok(code) => Some(code),
            Err(message) => {
                warn!(container = %id, "could not observe container: {}", message);
                return ProcessStateReport::new(ProcessState::ErrorGettingState)
                    .log_file_name(execution.log_file.display().to_string());
            }
        },
    };

    let mut report = match read_payload(&execution.exception_file).await {
        Some(exception) => ProcessStateReport::new(ProcessState::PythonException)
            .exception(exception),
        None => match return_code {
            Some(0) => {
                let mut report = ProcessStateReport::new(ProcessState::Succeeded);
                if let Some(result) = read_payload(&execution.result_file).await {
                    report = report.result(result);
                }
                report
            }
            _ => ProcessStateReport::new(ProcessState::NonZeroReturnCode),
        },
    };
    if let Some(code) = return_code {
        report = report.return_code(code);
    }
    report.log_file_name(execution.log_file.display().to_string())
}

async fn wait_container(id: &str, log_file: &Path) -> Result<i32, String> {
    let output = Command::new("docker")
        .args(["wait", id])
        .output()
        .await
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    let code: i32 = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|_| "unparseable exit code from docker wait".to_string())?;

    // Best effort: container output into the job log, then clean up.
    if let Ok(logs) = Command::new("docker").args(["logs", id]).output().await {
        let mut bytes = logs.stdout;
        bytes.extend_from_slice(&logs.stderr);
        let _ = tokio::fs::write(log_file, bytes).await;
    }
    let _ = Command::new("docker").args(["rm", id]).output().await;
    Ok(code)
}

async fn read_payload(path: &Path) -> Option<Blob> {
    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => Some(Blob::new(bytes)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
