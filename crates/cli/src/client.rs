// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connects to `mcd` over its Unix socket when one is running; falls back to
//! operating on the state store directly (through a local
//! [`mc_engine::Kernel`] with no git adapter wired up) when it isn't, per the
//! Open Question recorded in DESIGN.md: the CLI should work standalone for a
//! single operator, and only need the daemon for live event streaming and
//! concurrent-writer serialization.

use std::path::{Path, PathBuf};

use mc_adapters::git::Git2CommitAdapter;
use mc_engine::Kernel;
use mc_wire::{Mutation, Query, Request, Response};
use tokio::net::UnixStream;

use crate::exit_error::ExitError;

pub enum DaemonClient {
    Remote { stream: UnixStream },
    Local { kernel: Kernel<Git2CommitAdapter> },
}

impl DaemonClient {
    /// Try the daemon socket first; if nothing is listening, fall back to a
    /// local kernel bound directly to `.mission/` under `root`.
    pub async fn connect(root: &Path) -> Self {
        let mission_root = root.join(".mission");
        match UnixStream::connect(socket_path(root)).await {
            Ok(stream) => DaemonClient::Remote { stream },
            Err(_) => DaemonClient::Local { kernel: Kernel::new(mission_root, 1_000_000, 100_000) },
        }
    }

    pub async fn request(&mut self, req: Request) -> Result<Response, ExitError> {
        match self {
            DaemonClient::Remote { stream } => {
                let data = mc_wire::encode(&req).map_err(|e| ExitError::daemon_unreachable(e.to_string()))?;
                mc_wire::write_message(stream, &data).await.map_err(|e| ExitError::daemon_unreachable(e.to_string()))?;
                let bytes = mc_wire::read_message(stream).await.map_err(|e| ExitError::daemon_unreachable(e.to_string()))?;
                mc_wire::decode(&bytes).map_err(|e| ExitError::new(1, e.to_string()))
            }
            DaemonClient::Local { kernel } => Ok(dispatch_local(kernel, req).await),
        }
    }
}

async fn dispatch_local(kernel: &Kernel<Git2CommitAdapter>, req: Request) -> Response {
    let now = chrono::Utc::now().to_rfc3339();
    match req {
        Request::Ping => Response::Pong,
        Request::Hello { .. } => Response::Hello { version: concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")).to_string() },
        Request::Status | Request::Query { query: Query::Status } => local_status(kernel),
        Request::Shutdown { .. } => Response::Ok,
        Request::Query { query } => local_query(kernel, query),
        Request::Mutate { mutation } => local_mutation(kernel, mutation, now).await,
    }
}

fn local_status(kernel: &Kernel<Git2CommitAdapter>) -> Response {
    let store = kernel.store();
    match (store.read_stage(), store.read_gates(), store.read_workers()) {
        (Ok(stage), Ok(gates), Ok(workers)) => Response::Status { stage, gates, worker_count: workers.len() },
        (Err(e), ..) | (_, Err(e), _) | (_, _, Err(e)) => Response::Error { message: e.to_string() },
    }
}

fn local_query(kernel: &Kernel<Git2CommitAdapter>, query: Query) -> Response {
    let store = kernel.store();
    match query {
        Query::Status => local_status(kernel),
        Query::ListTasks => store.read_tasks().map(|tasks| Response::Tasks { tasks }).unwrap_or_else(err_response),
        Query::GetTask { id } => store.read_task(&id).map(|task| Response::Task { task: task.map(Box::new) }).unwrap_or_else(err_response),
        Query::ReadyTasks => kernel.graph().ready().map(|tasks| Response::Tasks { tasks }).unwrap_or_else(engine_err_response),
        Query::BlockedTasks => kernel.graph().blocked().map(|tasks| Response::Tasks { tasks }).unwrap_or_else(engine_err_response),
        Query::DepTree { id } => kernel.graph().dep_tree(&id).map(|tasks| Response::Tasks { tasks }).unwrap_or_else(engine_err_response),
        Query::GateStatus { stage } => match store.read_gates() {
            Ok(mut gates) => gates.remove(&stage).map(|gate| Response::Gate { gate }).unwrap_or_else(|| Response::Error { message: format!("no gate for stage {stage}") }),
            Err(e) => err_response(e),
        },
        Query::ListWorkers => store.read_workers().map(|workers| Response::Workers { workers }).unwrap_or_else(err_response),
        Query::ReadAudit { limit } => store.read_audit(limit).map(|entries| Response::Audit { entries }).unwrap_or_else(err_response),
        Query::ReadCheckpoint { id } => store.read_checkpoint(&id).map(|checkpoint| Response::Checkpoint { checkpoint: Box::new(checkpoint) }).unwrap_or_else(err_response),
        Query::ValidateProcess { strict } => kernel.validate_process(strict).map(|()| Response::Ok).unwrap_or_else(engine_err_response),
    }
}

async fn local_mutation(kernel: &Kernel<Git2CommitAdapter>, mutation: Mutation, now: String) -> Response {
    match mutation {
        Mutation::CreateTask { title, stage, zone, persona, scope_paths, deps } => kernel
            .create_task("cli", title, stage, zone, persona, scope_paths, deps, now)
            .await
            .map(|id| Response::TaskCreated { id })
            .unwrap_or_else(engine_err_response),
        Mutation::UpdateTaskStatus { id, status, reason } => kernel
            .update_task_status("cli", &id, status, reason, now)
            .await
            .map(|task| Response::Task { task: Some(Box::new(task)) })
            .unwrap_or_else(engine_err_response),
        Mutation::AddTaskDependency { id, dep } => kernel
            .add_task_dependency("cli", &id, &dep, now)
            .await
            .map(|task| Response::Task { task: Some(Box::new(task)) })
            .unwrap_or_else(engine_err_response),
        Mutation::RemoveTaskDependency { id, dep } => kernel
            .remove_task_dependency("cli", &id, &dep, now)
            .await
            .map(|task| Response::Task { task: Some(Box::new(task)) })
            .unwrap_or_else(engine_err_response),
        Mutation::SatisfyGate { stage, criterion } => kernel
            .satisfy_gate("cli", stage, &criterion, now)
            .await
            .map(|gate| Response::Gate { gate })
            .unwrap_or_else(engine_err_response),
        Mutation::ApproveGate { stage } => kernel.approve_gate("cli", stage, now).await.map(|gate| Response::Gate { gate }).unwrap_or_else(engine_err_response),
        Mutation::AdvanceStage { target } => match kernel.workflow().advance(target, now) {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::SpawnWorker { .. } => Response::Error { message: "spawning workers requires a running mcd daemon".to_string() },
        Mutation::KillWorker { .. } => Response::Error { message: "killing workers requires a running mcd daemon".to_string() },
        Mutation::Commit { category, paths, summary } => {
            kernel.commit("cli", category, &paths, &summary, now).await;
            Response::Ok
        }
        Mutation::CreateCheckpoint => kernel
            .create_checkpoint("cli", now)
            .await
            .map(|checkpoint| Response::Checkpoint { checkpoint: Box::new(checkpoint) })
            .unwrap_or_else(engine_err_response),
        Mutation::RestartFromCheckpoint { id } => kernel
            .restart_from_checkpoint("cli", &id, now)
            .await
            .map(|checkpoint| Response::Checkpoint { checkpoint: Box::new(checkpoint) })
            .unwrap_or_else(engine_err_response),
    }
}

fn err_response(e: mc_storage::StorageError) -> Response {
    Response::Error { message: e.to_string() }
}

fn engine_err_response(e: mc_engine::EngineError) -> Response {
    if let mc_engine::EngineError::ProcessViolation(message) = e {
        return Response::ProcessViolation { message };
    }
    Response::Error { message: e.to_string() }
}

pub fn socket_path(root: &Path) -> PathBuf {
    root.join(".mission").join("mcd.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_is_rooted_under_mission_dir() {
        let path = socket_path(Path::new("/srv/project"));
        assert_eq!(path, PathBuf::from("/srv/project/.mission/mcd.sock"));
    }

    #[tokio::test]
    async fn connect_falls_back_to_local_kernel_when_no_socket_is_listening() {
        let dir = tempfile::tempdir().unwrap();
        let client = DaemonClient::connect(dir.path()).await;
        assert!(matches!(client, DaemonClient::Local { .. }));
    }
}
