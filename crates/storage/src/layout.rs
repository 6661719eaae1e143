// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk layout rooted at `.mission/`.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_file(&self) -> PathBuf {
        self.root.join("state/stage.json")
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join("state/tasks.jsonl")
    }

    pub fn gates_file(&self) -> PathBuf {
        self.root.join("state/gates.json")
    }

    pub fn workers_file(&self) -> PathBuf {
        self.root.join("state/workers.json")
    }

    pub fn zones_file(&self) -> PathBuf {
        self.root.join("state/zones.json")
    }

    pub fn audit_file(&self) -> PathBuf {
        self.root.join("audit.jsonl")
    }

    pub fn finding_file(&self, task_id: &str) -> PathBuf {
        self.root.join(format!("findings/{task_id}.md"))
    }

    pub fn briefing_file(&self, task_id: &str) -> PathBuf {
        self.root.join(format!("handoffs/{task_id}-briefing.json"))
    }

    pub fn handoff_file(&self, worker_id: &str, timestamp: &str) -> PathBuf {
        self.root.join(format!("handoffs/{worker_id}-{timestamp}.json"))
    }

    pub fn checkpoint_dir(&self, checkpoint_id: &str) -> PathBuf {
        self.root.join(format!("checkpoints/{checkpoint_id}"))
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}
