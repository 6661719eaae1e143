// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint: a snapshot of the workflow cursor, task list, and findings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::Stage;
use crate::task::Task;

pub const CURRENT_CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error writing checkpoint: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub id: String,
    pub stage: Stage,
    pub index: u32,
    pub created_at: String,
    pub tasks: Vec<Task>,
    pub findings: Vec<String>,
}

impl Checkpoint {
    pub fn new(stage: Stage, index: u32, created_at: impl Into<String>, tasks: Vec<Task>, findings: Vec<String>) -> Self {
        Self {
            version: CURRENT_CHECKPOINT_VERSION,
            id: format!("cp-{}-{index}", stage.as_str()),
            stage,
            index,
            created_at: created_at.into(),
            tasks,
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_encodes_stage_and_index() {
        let cp = Checkpoint::new(Stage::Design, 3, "now", vec![], vec![]);
        assert_eq!(cp.id, "cp-design-3");
    }
}
