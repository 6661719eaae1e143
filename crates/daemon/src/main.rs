// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mcd`: the MissionControl orchestration daemon.

mod config;
mod hub;
mod listener;
mod logging;
mod supervisor;
mod watcher;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fs2::FileExt;
use mc_adapters::git::Git2CommitAdapter;
use mc_adapters::process::TokioProcessAdapter;
use mc_engine::{GitCommitCategories, Kernel};

use config::CliOverrides;
use hub::Hub;
use listener::Listener;
use supervisor::Supervisor;
use watcher::Watcher;

#[derive(Parser)]
#[command(name = "mcd", about = "MissionControl orchestration daemon")]
struct Cli {
    /// Project root containing `.mission/`. Defaults to the current directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon in the foreground.
    Start {
        #[arg(long, env = "MC_POLL_INTERVAL_MS")]
        poll_interval_ms: Option<u64>,
        #[arg(long, env = "MC_LOG_LEVEL")]
        log_level: Option<String>,
    },
    /// Stop a running daemon by signalling its locked PID.
    Stop,
    /// Report whether a daemon appears to be running.
    Status,
}

#[derive(Debug, thiserror::Error)]
enum DaemonError {
    #[error("another mcd is already running for this project (lock held)")]
    AlreadyRunning,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

fn mission_dir(root: &Path) -> PathBuf {
    root.join(".mission")
}

fn lock_path(mission_root: &Path) -> PathBuf {
    mission_root.join("mcd.lock")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let root = cli.root.clone().unwrap_or_else(|| std::env::current_dir().expect("current directory is accessible"));
    let mission_root = mission_dir(&root);

    let result = match cli.command {
        Command::Start { poll_interval_ms, log_level } => run_start(mission_root, CliOverrides { poll_interval_ms, log_level }).await,
        Command::Stop => run_stop(mission_root),
        Command::Status => run_status(mission_root),
    };

    if let Err(e) = result {
        eprintln!("mcd: {e}");
        std::process::exit(1);
    }
}

fn acquire_lock(mission_root: &Path) -> Result<std::fs::File, DaemonError> {
    std::fs::create_dir_all(mission_root)?;
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(lock_path(mission_root))?;
    lock_file.try_lock_exclusive().map_err(|_| DaemonError::AlreadyRunning)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

async fn run_start(mission_root: PathBuf, overrides: CliOverrides) -> Result<(), DaemonError> {
    std::fs::create_dir_all(&mission_root)?;
    let cfg = config::load(&mission_root, &overrides)?;

    let _lock = acquire_lock(&mission_root)?;
    let _logging_guard = logging::init(&cfg.log_level, cfg.log_format, &mission_root.join("logs")).map_err(DaemonError::Io)?;

    tracing::info!(root = %mission_root.display(), "mcd starting");

    let store = Arc::new(mc_storage::StateStore::open(&mission_root));
    let hub = Arc::new(Hub::new());

    let repo_root = mission_root.parent().unwrap_or(&mission_root).to_path_buf();
    let git_adapter = Arc::new(Git2CommitAdapter::new(repo_root));
    let kernel = Kernel::<Git2CommitAdapter>::new(mission_root.clone(), cfg.global_token_budget, cfg.worker_token_budget)
        .with_git(git_adapter, GitCommitCategories(cfg.git_commit_categories.clone()));
    let kernel = Arc::new(kernel);

    let process_adapter = Arc::new(TokioProcessAdapter);
    let supervisor = Arc::new(Supervisor::new(store.clone(), hub.clone(), process_adapter, cfg.idle_threshold_secs, cfg.stuck_threshold_secs));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let watcher = Watcher::new(store.clone(), hub.clone(), cfg.poll_interval_ms);
    let watcher_shutdown = shutdown_rx.clone();
    let watcher_handle = tokio::spawn(watcher.run(watcher_shutdown));

    let api_token = std::env::var("MC_API_TOKEN").ok();
    let listener = Listener::new(kernel, supervisor, hub.clone(), listener::socket_path(&mission_root), api_token);
    let listener_shutdown = shutdown_rx.clone();
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.serve(listener_shutdown).await {
            tracing::error!(error = %e, "listener exited with error");
        }
    });

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(watcher_handle, listener_handle);
    Ok(())
}

fn run_stop(mission_root: PathBuf) -> Result<(), DaemonError> {
    let path = lock_path(&mission_root);
    let pid = std::fs::read_to_string(&path).map_err(DaemonError::Io)?;
    let pid: i32 = pid.trim().parse().map_err(|_| DaemonError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed lock file")))?;
    #[cfg(unix)]
    {
        let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::Signal::SIGTERM);
    }
    println!("sent SIGTERM to mcd (pid {pid})");
    Ok(())
}

fn run_status(mission_root: PathBuf) -> Result<(), DaemonError> {
    let path = lock_path(&mission_root);
    if !path.exists() {
        println!("mcd: not running");
        return Ok(());
    }
    let lock_file = std::fs::OpenOptions::new().write(true).open(&path)?;
    match lock_file.try_lock_exclusive() {
        Ok(()) => {
            let _ = lock_file.unlock();
            println!("mcd: not running (stale lock file)");
        }
        Err(_) => println!("mcd: running"),
    }
    Ok(())
}
