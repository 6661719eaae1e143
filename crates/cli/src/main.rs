// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mc`: the MissionControl command-line client.

mod client;
mod commands;
mod exit_error;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "mc", about = "MissionControl orchestration client")]
struct Cli {
    /// Project root containing `.mission/`. Defaults to the current directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(|| std::env::current_dir().expect("current directory is accessible"));

    if let Err(e) = commands::run(cli.command, root).await {
        eprintln!("mc: {}", e.message);
        std::process::exit(e.code);
    }
}
