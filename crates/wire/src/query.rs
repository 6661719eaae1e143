// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query types for reading daemon state.

use mc_core::{Stage, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    /// Current stage and per-gate status summary.
    Status,
    ListTasks,
    GetTask { id: TaskId },
    ReadyTasks,
    BlockedTasks,
    DepTree { id: TaskId },
    GateStatus { stage: Stage },
    ListWorkers,
    ReadAudit {
        #[serde(default)]
        limit: Option<usize>,
    },
    ReadCheckpoint { id: String },
    /// Process-enforcement check backing `commit --validate-only`: re-derive
    /// task-backed gate criteria from live tasks and report whether the
    /// current stage's gate would pass a commit. `strict` additionally
    /// requires the gate to be approved, not merely satisfied.
    ValidateProcess { strict: bool },
}
