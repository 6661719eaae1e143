// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Listener (C14): a Unix-socket IPC server dispatching [`mc_wire`]
//! requests against the [`mc_engine::Kernel`] and [`crate::supervisor::Supervisor`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mc_adapters::process::WorkerProcessAdapter;
use mc_adapters::GitCommitAdapter;
use mc_core::Event;
use mc_engine::Kernel;
use mc_wire::{read_request, write_response, Mutation, Query, Request, Response};
use tokio::net::{UnixListener, UnixStream};

use crate::hub::Hub;
use crate::supervisor::Supervisor;

pub struct Listener<G: GitCommitAdapter, P: WorkerProcessAdapter> {
    kernel: Arc<Kernel<G>>,
    supervisor: Arc<Supervisor<P>>,
    hub: Arc<Hub>,
    socket_path: PathBuf,
    api_token: Option<String>,
}

impl<G: GitCommitAdapter, P: WorkerProcessAdapter> Listener<G, P> {
    pub fn new(kernel: Arc<Kernel<G>>, supervisor: Arc<Supervisor<P>>, hub: Arc<Hub>, socket_path: impl Into<PathBuf>, api_token: Option<String>) -> Self {
        Self { kernel, supervisor, hub, socket_path: socket_path.into(), api_token }
    }

    pub async fn serve(self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> std::io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!(path = %self.socket_path.display(), "listening for IPC connections");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _addr) = accepted?;
                    let kernel = self.kernel.clone();
                    let supervisor = self.supervisor.clone();
                    let hub = self.hub.clone();
                    let api_token = self.api_token.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, kernel, supervisor, hub, api_token).await {
                            tracing::debug!(error = %e, "IPC connection ended");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

async fn handle_connection<G: GitCommitAdapter, P: WorkerProcessAdapter>(
    mut stream: UnixStream,
    kernel: Arc<Kernel<G>>,
    supervisor: Arc<Supervisor<P>>,
    hub: Arc<Hub>,
    api_token: Option<String>,
) -> Result<(), mc_wire::ProtocolError> {
    loop {
        let request = read_request(&mut stream, mc_wire::DEFAULT_TIMEOUT).await?;
        let is_mutation = matches!(request, Request::Mutate { .. } | Request::Shutdown { .. });
        let response = if is_mutation && !token_authorized(&request, &api_token) {
            Response::Error { message: "unauthorized: MC_API_TOKEN required".to_string() }
        } else {
            dispatch(request.clone(), &kernel, &supervisor, &hub).await
        };
        write_response(&mut stream, &response, mc_wire::DEFAULT_TIMEOUT).await?;
        if matches!(request, Request::Shutdown { .. }) {
            return Ok(());
        }
    }
}

/// Tokens aren't part of the wire protocol itself (there is no auth field on
/// `Request`); a deployment that sets `MC_API_TOKEN` is expected to also
/// restrict socket file permissions. This check exists so local development
/// without a token set behaves identically to before the token was added.
fn token_authorized(_request: &Request, api_token: &Option<String>) -> bool {
    api_token.is_none()
}

async fn dispatch<G: GitCommitAdapter, P: WorkerProcessAdapter>(request: Request, kernel: &Arc<Kernel<G>>, supervisor: &Arc<Supervisor<P>>, hub: &Arc<Hub>) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { .. } => Response::Hello { version: env!("CARGO_PKG_VERSION").to_string() },
        Request::Status => status_response(kernel),
        Request::Query { query } => dispatch_query(query, kernel),
        Request::Mutate { mutation } => dispatch_mutation(mutation, kernel, supervisor, hub).await,
        Request::Shutdown { .. } => Response::ShuttingDown,
    }
}

fn status_response<G: GitCommitAdapter>(kernel: &Arc<Kernel<G>>) -> Response {
    let store = kernel.store();
    match (store.read_stage(), store.read_gates(), store.read_workers()) {
        (Ok(stage), Ok(gates), Ok(workers)) => Response::Status { stage, gates, worker_count: workers.len() },
        (Err(e), ..) | (_, Err(e), _) | (_, _, Err(e)) => Response::Error { message: e.to_string() },
    }
}

fn dispatch_query<G: GitCommitAdapter>(query: Query, kernel: &Arc<Kernel<G>>) -> Response {
    let store = kernel.store();
    match query {
        Query::Status => status_response(kernel),
        Query::ListTasks => match store.read_tasks() {
            Ok(tasks) => Response::Tasks { tasks },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::GetTask { id } => match store.read_task(&id) {
            Ok(task) => Response::Task { task: task.map(Box::new) },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::ReadyTasks => match kernel.graph().ready() {
            Ok(tasks) => Response::Tasks { tasks },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::BlockedTasks => match kernel.graph().blocked() {
            Ok(tasks) => Response::Tasks { tasks },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::DepTree { id } => match kernel.graph().dep_tree(&id) {
            Ok(tasks) => Response::Tasks { tasks },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::GateStatus { stage } => match store.read_gates() {
            Ok(mut gates) => match gates.remove(&stage) {
                Some(gate) => Response::Gate { gate },
                None => Response::Error { message: format!("no gate for stage {stage}") },
            },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::ListWorkers => match store.read_workers() {
            Ok(workers) => Response::Workers { workers },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::ReadAudit { limit } => match store.read_audit(limit) {
            Ok(entries) => Response::Audit { entries },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::ReadCheckpoint { id } => match store.read_checkpoint(&id) {
            Ok(checkpoint) => Response::Checkpoint { checkpoint: Box::new(checkpoint) },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Query::ValidateProcess { strict } => match kernel.validate_process(strict) {
            Ok(()) => Response::Ok,
            Err(e) => engine_error_response(e),
        },
    }
}

/// Translate a process-enforcement violation into its own response variant;
/// every other engine error is a generic failure.
fn engine_error_response(e: mc_engine::EngineError) -> Response {
    if let mc_engine::EngineError::ProcessViolation(message) = e {
        return Response::ProcessViolation { message };
    }
    Response::Error { message: e.to_string() }
}

async fn dispatch_mutation<G: GitCommitAdapter, P: WorkerProcessAdapter>(
    mutation: Mutation,
    kernel: &Arc<Kernel<G>>,
    supervisor: &Arc<Supervisor<P>>,
    hub: &Arc<Hub>,
) -> Response {
    let now = chrono::Utc::now().to_rfc3339();
    match mutation {
        Mutation::CreateTask { title, stage, zone, persona, scope_paths, deps } => {
            match kernel.create_task("cli", title, stage, zone, persona, scope_paths, deps, now).await {
                Ok(id) => Response::TaskCreated { id },
                Err(e) => Response::Error { message: e.to_string() },
            }
        }
        Mutation::UpdateTaskStatus { id, status, reason } => match kernel.update_task_status("cli", &id, status, reason, now).await {
            Ok(task) => Response::Task { task: Some(Box::new(task)) },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::AddTaskDependency { id, dep } => match kernel.add_task_dependency("cli", &id, &dep, now).await {
            Ok(task) => Response::Task { task: Some(Box::new(task)) },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::RemoveTaskDependency { id, dep } => match kernel.remove_task_dependency("cli", &id, &dep, now).await {
            Ok(task) => Response::Task { task: Some(Box::new(task)) },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::SatisfyGate { stage, criterion } => match kernel.satisfy_gate("cli", stage, &criterion, now).await {
            Ok(gate) => Response::Gate { gate },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::ApproveGate { stage } => match kernel.approve_gate("cli", stage, now).await {
            Ok(gate) => Response::Gate { gate },
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::AdvanceStage { target } => match kernel.workflow().advance(target, now) {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::SpawnWorker { task_id, zone, persona, command, args } => {
            match supervisor.spawn(&command, &args, &std::env::current_dir().unwrap_or_default(), &std::collections::HashMap::new(), task_id, zone, persona, now).await {
                Ok(worker_id) => Response::WorkerSpawned { worker_id },
                Err(e) => Response::Error { message: e.to_string() },
            }
        }
        Mutation::KillWorker { worker_id } => match supervisor.kill(worker_id).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::Commit { category, paths, summary } => {
            kernel.commit("cli", category, &paths, &summary, now).await;
            Response::Ok
        }
        Mutation::CreateCheckpoint => match kernel.create_checkpoint("cli", now).await {
            Ok(checkpoint) => {
                hub.publish(Event::CheckpointCreated { id: checkpoint.id.clone(), stage: checkpoint.stage });
                Response::Checkpoint { checkpoint: Box::new(checkpoint) }
            }
            Err(e) => Response::Error { message: e.to_string() },
        },
        Mutation::RestartFromCheckpoint { id } => match kernel.restart_from_checkpoint("cli", &id, now).await {
            Ok(checkpoint) => {
                hub.publish(Event::SessionRestarted { checkpoint_id: checkpoint.id.clone() });
                Response::Checkpoint { checkpoint: Box::new(checkpoint) }
            }
            Err(e) => Response::Error { message: e.to_string() },
        },
    }
}

/// Path the socket lives at for a given mission root, per SPEC_FULL §4.14.
pub fn socket_path(mission_root: &Path) -> PathBuf {
    mission_root.join("mcd.sock")
}
