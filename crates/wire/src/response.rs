// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response types sent from `mcd` (the daemon) back to `mc` (the CLI).

use std::collections::BTreeMap;

use mc_core::{AuditEntry, Checkpoint, Gate, Stage, Task, TaskId, WorkerRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Pong,
    Hello { version: String },
    ShuttingDown,
    Error { message: String },
    /// A process-enforcement check failed (`commit --validate-only`). Kept
    /// distinct from `Error` so the CLI can map it to its own exit code.
    ProcessViolation { message: String },

    Status {
        stage: Stage,
        gates: BTreeMap<Stage, Gate>,
        worker_count: usize,
    },
    Tasks { tasks: Vec<Task> },
    Task { task: Option<Box<Task>> },
    Gate { gate: Gate },
    Workers { workers: Vec<WorkerRecord> },
    Audit { entries: Vec<AuditEntry> },
    Checkpoint { checkpoint: Box<Checkpoint> },
    TaskCreated { id: TaskId },
    WorkerSpawned { worker_id: mc_core::WorkerId },
}
