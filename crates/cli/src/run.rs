// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level demo runner — shared by `main` and, eventually, integration
//! tests that want to drive the orchestrator end-to-end.

use std::sync::Arc;
use std::time::Duration;

use broadcast_engine::clock::SystemClock;
use broadcast_engine::config::EngineConfig;
use broadcast_engine::orchestrator::Orchestrator;
use broadcast_engine::testing::{FakeSessionClient, InMemoryRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Cli;
use crate::scenario;

pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match cli.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing(&cli);

    let scenario = scenario::load(&cli.scenario)?;

    let config = EngineConfig::parse_from(["broadcastctl"]);
    config.validate()?;

    let orchestrator = Arc::new(Orchestrator::new(InMemoryRepository::new(), FakeSessionClient::new(), SystemClock, config));
    let seeded = scenario::seed(&orchestrator_repo(&orchestrator), &scenario).await;

    let job = orchestrator.start_posting(seeded.tenant_id.clone(), seeded.ad_id.clone(), cli.priority_only).await?;
    info!(job_id = %job.id, "job started");

    tokio::time::sleep(Duration::from_secs(cli.run_seconds)).await;

    orchestrator.stop_job(&job.id).await?;
    info!(job_id = %job.id, "stop requested");

    // Give the round loop a moment to observe the stop flag and finish up.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = orchestrator.get_job_stats(&job.id).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    for entry in orchestrator.get_job_logs(&job.id, 0).await? {
        println!("[{}] {:?} {}", entry.seq, entry.outcome, entry.message);
    }

    Ok(())
}

fn orchestrator_repo(orchestrator: &Orchestrator<InMemoryRepository, FakeSessionClient, SystemClock>) -> &InMemoryRepository {
    &orchestrator.context().repo
}
