// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! meadowgrid agent binary.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mg_agent::{env, Agent, AgentConfig};
use mg_core::Resources;

/// Registers with a coordinator, polls for work, and runs user code as
/// subprocesses or containers.
#[derive(Parser)]
#[command(name = "mg-agent", version)]
struct Args {
    /// Coordinator address
    #[arg(long, env = "MG_COORDINATOR_ADDR", default_value = "127.0.0.1:15319")]
    coordinator: String,

    /// Identifier to register under (stable across restarts by choice of
    /// the operator; a random one is generated otherwise)
    #[arg(long)]
    agent_id: Option<String>,

    /// Resource capacity, e.g. --resource cpu=4 --resource memory=16
    #[arg(long = "resource", value_name = "NAME=AMOUNT", value_parser = parse_resource)]
    resources: Vec<(String, f64)>,

    /// Serve only this job (job-specific agent)
    #[arg(long)]
    job_id: Option<String>,

    /// Root directory for deployment caches, job scratch space, and logs
    #[arg(long, default_value = "mg-agent-data")]
    working_dir: PathBuf,
}

fn parse_resource(raw: &str) -> Result<(String, f64), String> {
    let (name, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=AMOUNT, got '{}'", raw))?;
    let amount: f64 =
        amount.parse().map_err(|_| format!("'{}' is not a number", amount))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("resource amounts must be non-negative, got {}", amount));
    }
    Ok((name.to_string(), amount))
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("MG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let agent_id = args
        .agent_id
        .unwrap_or_else(|| format!("agent-{}", nanoid::nanoid!(10)));
    let resources: Resources = args.resources.into_iter().collect();

    let config = AgentConfig {
        coordinator_addr: args.coordinator,
        agent_id: agent_id.into(),
        resources,
        job_affinity: args.job_id.map(Into::into),
        working_dir: args.working_dir,
        poll_interval: env::poll_interval(),
    };
    let agent = Agent::new(config);

    let cancel = CancellationToken::new();
    let run = agent.run(cancel.clone());
    tokio::pin!(run);
    tokio::select! {
        result = &mut run => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("agent failed: {}", e);
                ExitCode::FAILURE
            }
        },
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("interrupted, shutting down"),
                Err(e) => error!("signal handler failed: {}", e),
            }
            cancel.cancel();
            let _ = run.await;
            ExitCode::SUCCESS
        }
    }
}
