// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod config;
mod run;
mod scenario;

use clap::Parser;
use tracing::error;

use config::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run::run(cli).await {
        error!("fatal: {err:#}");
        std::process::exit(1);
    }
}
