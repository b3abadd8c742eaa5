// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Demo CLI caller of the broadcast orchestrator facade.
#[derive(Debug, Parser)]
#[command(name = "broadcastctl", version, about)]
pub struct Cli {
    /// Path to a scenario file describing a tenant, its sessions/groups,
    /// and the ad to broadcast.
    #[arg(long, env = "BROADCASTCTL_SCENARIO")]
    pub scenario: PathBuf,

    /// How long to let the job run before issuing `StopJob`, in seconds.
    #[arg(long, env = "BROADCASTCTL_RUN_SECONDS", default_value = "5")]
    pub run_seconds: u64,

    /// Opt into the priority-group filter for this run.
    #[arg(long, env = "BROADCASTCTL_PRIORITY_ONLY")]
    pub priority_only: bool,

    /// Log format (json or text).
    #[arg(long, env = "BROADCASTCTL_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BROADCASTCTL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}
