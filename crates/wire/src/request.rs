// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request types sent from `mc` (the CLI) to `mcd` (the daemon).

use mc_core::{AuditCategory, Stage, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

use crate::Query;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello { version: String },
    Query { query: Query },
    Mutate { mutation: Mutation },
    Shutdown {
        #[serde(default)]
        kill: bool,
    },
    Status,
}

/// State-mutating operations. Each maps 1:1 to an `mc-engine::Kernel` method;
/// the listener dispatches these after checking `MC_API_TOKEN`, if set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Mutation {
    CreateTask {
        title: String,
        stage: Stage,
        zone: String,
        persona: String,
        #[serde(default)]
        scope_paths: Vec<String>,
        #[serde(default)]
        deps: Vec<TaskId>,
    },
    UpdateTaskStatus {
        id: TaskId,
        status: TaskStatus,
        #[serde(default)]
        reason: Option<String>,
    },
    AddTaskDependency {
        id: TaskId,
        dep: TaskId,
    },
    RemoveTaskDependency {
        id: TaskId,
        dep: TaskId,
    },
    SatisfyGate {
        stage: Stage,
        criterion: String,
    },
    ApproveGate {
        stage: Stage,
    },
    AdvanceStage {
        target: Stage,
    },
    SpawnWorker {
        task_id: TaskId,
        zone: String,
        persona: String,
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    KillWorker {
        worker_id: mc_core::WorkerId,
    },
    Commit {
        category: AuditCategory,
        #[serde(default)]
        paths: Vec<std::path::PathBuf>,
        summary: String,
    },
    CreateCheckpoint,
    RestartFromCheckpoint {
        id: String,
    },
}
