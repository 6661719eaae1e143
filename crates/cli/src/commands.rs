// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations. Each returns an [`ExitError`] carrying the
//! process exit code the failure should produce; `main` converts `Ok(())`
//! into exit code 0.

use std::path::PathBuf;

use clap::Subcommand;
use mc_core::{AuditCategory, Stage, TaskId, TaskStatus, WorkerId};
use mc_wire::{Mutation, Query, Request, Response};

use crate::client::DaemonClient;
use crate::exit_error::ExitError;

#[derive(Subcommand)]
pub enum Command {
    /// Initialize `.mission/` in the current (or given) project root.
    Init,
    /// Show the current stage, gate states, and worker count.
    Status,
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Gate(GateCommand),
    #[command(subcommand)]
    Stage(StageCommand),
    /// Spawn a worker process for a task.
    Spawn {
        task_id: String,
        zone: String,
        persona: String,
        command: String,
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Kill a running worker.
    Kill { worker_id: String },
    /// List registered workers.
    Workers,
    /// Commit staged state-file changes, or just check whether a commit
    /// would be allowed.
    Commit {
        /// Run the process-enforcement check only; make no commit.
        #[arg(long)]
        validate_only: bool,
        /// With `--validate-only`, also require the current gate to be
        /// approved, not merely satisfied.
        #[arg(long)]
        strict: bool,
        category: Option<String>,
        summary: Option<String>,
        #[arg(trailing_var_arg = true)]
        paths: Vec<PathBuf>,
    },
    #[command(subcommand)]
    Checkpoint(CheckpointCommand),
    /// Read recent audit log entries.
    Audit {
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(subcommand)]
    Daemon(DaemonCommand),
}

#[derive(Subcommand)]
pub enum TaskCommand {
    Create {
        title: String,
        stage: String,
        zone: String,
        persona: String,
        #[arg(long, value_delimiter = ',')]
        scope: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        deps: Vec<String>,
    },
    Update {
        id: String,
        status: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Ready,
    Blocked,
    #[command(name = "dep-tree")]
    DepTree { id: String },
    #[command(subcommand)]
    Dep(DepCommand),
}

#[derive(Subcommand)]
pub enum DepCommand {
    Add { id: String, dep: String },
    Remove { id: String, dep: String },
}

#[derive(Subcommand)]
pub enum CheckpointCommand {
    /// Read a checkpoint bundle by id.
    Read { id: String },
    /// Snapshot the live task set under the current stage.
    Create,
    /// Restore the stage cursor and task list from a checkpoint bundle.
    Restart { id: String },
}

#[derive(Subcommand)]
pub enum GateCommand {
    Status { stage: String },
    Satisfy { stage: String, criterion: String },
    Approve { stage: String },
}

#[derive(Subcommand)]
pub enum StageCommand {
    Next { target: String },
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    Start,
    Stop,
    Status,
}

fn parse_stage(s: &str) -> Result<Stage, ExitError> {
    match s {
        "discovery" => Ok(Stage::Discovery),
        "goal" => Ok(Stage::Goal),
        "requirements" => Ok(Stage::Requirements),
        "planning" => Ok(Stage::Planning),
        "design" => Ok(Stage::Design),
        "implement" => Ok(Stage::Implement),
        "verify" => Ok(Stage::Verify),
        "validate" => Ok(Stage::Validate),
        "document" => Ok(Stage::Document),
        "release" => Ok(Stage::Release),
        other => Err(ExitError::usage(format!("unknown stage: {other}"))),
    }
}

fn parse_status(s: &str) -> Result<TaskStatus, ExitError> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "ready" => Ok(TaskStatus::Ready),
        "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
        "blocked" => Ok(TaskStatus::Blocked),
        "done" => Ok(TaskStatus::Done),
        other => Err(ExitError::usage(format!("unknown task status: {other}"))),
    }
}

fn parse_category(s: &str) -> Result<AuditCategory, ExitError> {
    match s {
        "task" => Ok(AuditCategory::Task),
        "gate" => Ok(AuditCategory::Gate),
        "stage" => Ok(AuditCategory::Stage),
        "worker" => Ok(AuditCategory::Worker),
        "handoff" => Ok(AuditCategory::Handoff),
        "commit" => Ok(AuditCategory::Commit),
        "checkpoint" => Ok(AuditCategory::Checkpoint),
        other => Err(ExitError::usage(format!("unknown audit category: {other}"))),
    }
}

pub async fn run(command: Command, root: PathBuf) -> Result<(), ExitError> {
    match command {
        Command::Init => init(&root),
        Command::Status => print_response(DaemonClient::connect(&root).await.request(Request::Status).await?),
        Command::Task(cmd) => run_task(cmd, root).await,
        Command::Gate(cmd) => run_gate(cmd, root).await,
        Command::Stage(StageCommand::Next { target }) => {
            let target = parse_stage(&target)?;
            let mut client = DaemonClient::connect(&root).await;
            print_response(client.request(Request::Mutate { mutation: Mutation::AdvanceStage { target } }).await?)
        }
        Command::Spawn { task_id, zone, persona, command, args } => {
            let task_id = TaskId::from(task_id.as_str());
            let mut client = DaemonClient::connect(&root).await;
            print_response(client.request(Request::Mutate { mutation: Mutation::SpawnWorker { task_id, zone, persona, command, args } }).await?)
        }
        Command::Kill { worker_id } => {
            let worker_id = WorkerId::from_string(worker_id);
            let mut client = DaemonClient::connect(&root).await;
            print_response(client.request(Request::Mutate { mutation: Mutation::KillWorker { worker_id } }).await?)
        }
        Command::Workers => {
            let mut client = DaemonClient::connect(&root).await;
            print_response(client.request(Request::Query { query: Query::ListWorkers }).await?)
        }
        Command::Commit { validate_only, strict, category, summary, paths } => {
            let mut client = DaemonClient::connect(&root).await;
            if validate_only {
                print_response(client.request(Request::Query { query: Query::ValidateProcess { strict } }).await?)
            } else {
                let category = parse_category(&category.ok_or_else(|| ExitError::usage("commit requires a category"))?)?;
                let summary = summary.ok_or_else(|| ExitError::usage("commit requires a summary"))?;
                print_response(client.request(Request::Mutate { mutation: Mutation::Commit { category, paths, summary } }).await?)
            }
        }
        Command::Checkpoint(cmd) => run_checkpoint(cmd, root).await,
        Command::Audit { limit } => {
            let mut client = DaemonClient::connect(&root).await;
            print_response(client.request(Request::Query { query: Query::ReadAudit { limit } }).await?)
        }
        Command::Daemon(cmd) => run_daemon(cmd, root).await,
    }
}

async fn run_task(cmd: TaskCommand, root: PathBuf) -> Result<(), ExitError> {
    let mut client = DaemonClient::connect(&root).await;
    let request = match cmd {
        TaskCommand::Create { title, stage, zone, persona, scope, deps } => {
            let stage = parse_stage(&stage)?;
            let deps = deps.iter().map(|s| TaskId::from(s.as_str())).collect();
            Request::Mutate { mutation: Mutation::CreateTask { title, stage, zone, persona, scope_paths: scope, deps } }
        }
        TaskCommand::Update { id, status, reason } => {
            let id = TaskId::from(id.as_str());
            let status = parse_status(&status)?;
            Request::Mutate { mutation: Mutation::UpdateTaskStatus { id, status, reason } }
        }
        TaskCommand::Ready => Request::Query { query: Query::ReadyTasks },
        TaskCommand::Blocked => Request::Query { query: Query::BlockedTasks },
        TaskCommand::DepTree { id } => Request::Query { query: Query::DepTree { id: TaskId::from(id.as_str()) } },
        TaskCommand::Dep(DepCommand::Add { id, dep }) => {
            Request::Mutate { mutation: Mutation::AddTaskDependency { id: TaskId::from(id.as_str()), dep: TaskId::from(dep.as_str()) } }
        }
        TaskCommand::Dep(DepCommand::Remove { id, dep }) => {
            Request::Mutate { mutation: Mutation::RemoveTaskDependency { id: TaskId::from(id.as_str()), dep: TaskId::from(dep.as_str()) } }
        }
    };
    print_response(client.request(request).await?)
}

async fn run_checkpoint(cmd: CheckpointCommand, root: PathBuf) -> Result<(), ExitError> {
    let mut client = DaemonClient::connect(&root).await;
    let request = match cmd {
        CheckpointCommand::Read { id } => Request::Query { query: Query::ReadCheckpoint { id } },
        CheckpointCommand::Create => Request::Mutate { mutation: Mutation::CreateCheckpoint },
        CheckpointCommand::Restart { id } => Request::Mutate { mutation: Mutation::RestartFromCheckpoint { id } },
    };
    print_response(client.request(request).await?)
}

async fn run_gate(cmd: GateCommand, root: PathBuf) -> Result<(), ExitError> {
    let mut client = DaemonClient::connect(&root).await;
    let request = match cmd {
        GateCommand::Status { stage } => Request::Query { query: Query::GateStatus { stage: parse_stage(&stage)? } },
        GateCommand::Satisfy { stage, criterion } => Request::Mutate { mutation: Mutation::SatisfyGate { stage: parse_stage(&stage)?, criterion } },
        GateCommand::Approve { stage } => Request::Mutate { mutation: Mutation::ApproveGate { stage: parse_stage(&stage)? } },
    };
    print_response(client.request(request).await?)
}

async fn run_daemon(cmd: DaemonCommand, root: PathBuf) -> Result<(), ExitError> {
    match cmd {
        DaemonCommand::Start => {
            std::process::Command::new("mcd")
                .arg("start")
                .arg("--root")
                .arg(&root)
                .spawn()
                .map_err(|e| ExitError::daemon_unreachable(format!("failed to launch mcd: {e}")))?;
            println!("mcd starting in the background");
            Ok(())
        }
        DaemonCommand::Stop => {
            let mut client = DaemonClient::connect(&root).await;
            print_response(client.request(Request::Shutdown { kill: false }).await?)
        }
        DaemonCommand::Status => print_response(DaemonClient::connect(&root).await.request(Request::Ping).await?),
    }
}

fn init(root: &std::path::Path) -> Result<(), ExitError> {
    let mission_root = root.join(".mission");
    std::fs::create_dir_all(&mission_root).map_err(|e| ExitError::new(1, e.to_string()))?;
    let store = mc_storage::StateStore::open(&mission_root);
    store.write_stage(Stage::Discovery, chrono::Utc::now().to_rfc3339())?;
    println!("initialized {}", mission_root.display());
    Ok(())
}

fn print_response(response: Response) -> Result<(), ExitError> {
    match &response {
        Response::Error { message } => return Err(ExitError::new(1, message.clone())),
        Response::ProcessViolation { message } => return Err(ExitError::usage(message.clone())),
        _ => {}
    }
    let json = serde_json::to_string_pretty(&response).map_err(|e| ExitError::new(1, e.to_string()))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stage_accepts_every_known_stage_name() {
        for name in ["discovery", "goal", "requirements", "planning", "design", "implement", "verify", "validate", "document", "release"] {
            assert!(parse_stage(name).is_ok(), "expected {name} to parse");
        }
    }

    #[test]
    fn parse_stage_rejects_unknown_name() {
        let err = parse_stage("not-a-stage").unwrap_err();
        assert_eq!(err.code, 2);
    }

    #[test]
    fn parse_status_accepts_both_in_progress_spellings() {
        assert_eq!(parse_status("in_progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(parse_status("in-progress").unwrap(), TaskStatus::InProgress);
    }

    #[test]
    fn parse_category_rejects_unknown_category() {
        assert!(parse_category("bogus").is_err());
    }
}
