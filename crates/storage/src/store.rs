// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The State Store (C1): the single owner of everything under `.mission/`.
//! All state-mutating operations are serialized by one lock, following the
//! teacher's lock-per-shared-state convention; reads take a read guard.

use std::collections::BTreeMap;

use mc_core::{AuditEntry, Checkpoint, Gate, Stage, Task, TaskId, WorkerRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic_json;
use crate::error::StorageError;
use crate::jsonl::{append_line, fold_latest, read_all};
use crate::layout::Layout;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StageCursor {
    stage: Stage,
    #[serde(default)]
    updated_at: String,
}

pub struct StateStore {
    layout: Layout,
    lock: RwLock<()>,
}

impl StateStore {
    pub fn open(root: impl Into<std::path::PathBuf>) -> Self {
        Self { layout: Layout::new(root), lock: RwLock::new(()) }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // --- reads -----------------------------------------------------------

    pub fn read_stage(&self) -> Result<Stage, StorageError> {
        let _guard = self.lock.read();
        let path = self.layout.stage_file();
        if !path.exists() {
            return Ok(Stage::Discovery);
        }
        let bytes = std::fs::read(&path)?;
        let cursor: StageCursor = serde_json::from_slice(&bytes)?;
        Ok(cursor.stage)
    }

    pub fn read_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let _guard = self.lock.read();
        fold_latest(&self.layout.tasks_file(), |t: &Task| t.id.to_string())
    }

    pub fn read_task(&self, id: &TaskId) -> Result<Option<Task>, StorageError> {
        Ok(self.read_tasks()?.into_iter().find(|t| &t.id == id))
    }

    pub fn read_gates(&self) -> Result<BTreeMap<Stage, Gate>, StorageError> {
        let _guard = self.lock.read();
        let path = self.layout.gates_file();
        if !path.exists() {
            let mut gates = BTreeMap::new();
            for stage in Stage::all() {
                gates.insert(stage, Gate::new(stage));
            }
            return Ok(gates);
        }
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn read_workers(&self) -> Result<Vec<WorkerRecord>, StorageError> {
        let _guard = self.lock.read();
        let path = self.layout.workers_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn read_audit(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, StorageError> {
        let _guard = self.lock.read();
        let mut entries = read_all::<AuditEntry>(&self.layout.audit_file())?;
        if let Some(limit) = limit {
            let start = entries.len().saturating_sub(limit);
            entries = entries.split_off(start);
        }
        Ok(entries)
    }

    // --- writes ------------------------------------------------------------

    pub fn write_stage(&self, stage: Stage, updated_at: impl Into<String>) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        write_atomic_json(&self.layout.stage_file(), &StageCursor { stage, updated_at: updated_at.into() })
    }

    /// Append a new line for `task`. Readers fold by latest-write-wins, so
    /// this is how both creation and every subsequent mutation are recorded.
    pub fn append_task(&self, task: &Task) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        append_line(&self.layout.tasks_file(), task)
    }

    pub fn rewrite_gates(&self, gates: &BTreeMap<Stage, Gate>) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        write_atomic_json(&self.layout.gates_file(), gates)
    }

    pub fn rewrite_workers(&self, workers: &[WorkerRecord]) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        write_atomic_json(&self.layout.workers_file(), workers)
    }

    /// Audit entries are best-effort: the caller's primary mutation has
    /// already succeeded by the time this is called, so a failure here is
    /// logged, not propagated as a rollback.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        append_line(&self.layout.audit_file(), entry)
    }

    pub fn write_finding(&self, task_id: &str, text: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        let path = self.layout.finding_file(task_id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn write_briefing(&self, task_id: &str, json: &serde_json::Value) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        write_atomic_json(&self.layout.briefing_file(task_id), json)
    }

    pub fn write_handoff(&self, worker_id: &str, timestamp: &str, raw_bytes: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        let path = self.layout.handoff_file(worker_id, timestamp);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, raw_bytes)?;
        Ok(())
    }

    /// Write a checkpoint bundle: `checkpoints/<id>/checkpoint.json`. The
    /// directory form (rather than a single rotated file) is deliberate —
    /// see DESIGN.md's Open Question record on checkpoint layout.
    pub fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let _guard = self.lock.write();
        let dir = self.layout.checkpoint_dir(&checkpoint.id);
        std::fs::create_dir_all(&dir)?;
        write_atomic_json(&dir.join("checkpoint.json"), checkpoint)
    }

    pub fn read_checkpoint(&self, checkpoint_id: &str) -> Result<Checkpoint, StorageError> {
        let _guard = self.lock.read();
        let path = self.layout.checkpoint_dir(checkpoint_id).join("checkpoint.json");
        let bytes = std::fs::read(&path)?;
        let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;
        if checkpoint.version > mc_core::checkpoint::CURRENT_CHECKPOINT_VERSION {
            return Err(mc_core::CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                supported: mc_core::checkpoint::CURRENT_CHECKPOINT_VERSION,
            }
            .into());
        }
        Ok(checkpoint)
    }

    /// Next monotonic checkpoint index for `stage`, derived from existing
    /// checkpoint directories named `cp-<stage>-<n>`.
    pub fn next_checkpoint_index(&self, stage: Stage) -> u32 {
        let _guard = self.lock.read();
        let checkpoints_dir = self.layout.root().join("checkpoints");
        let prefix = format!("cp-{}-", stage.as_str());
        let Ok(entries) = std::fs::read_dir(&checkpoints_dir) else {
            return 0;
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| name.strip_prefix(&prefix).map(str::to_string))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::{AuditCategory, Task};
    use tempfile::tempdir;

    #[test]
    fn fresh_store_defaults_stage_to_discovery() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        assert_eq!(store.read_stage().unwrap(), Stage::Discovery);
    }

    #[test]
    fn write_then_read_stage_round_trips() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        store.write_stage(Stage::Planning, "t0").unwrap();
        assert_eq!(store.read_stage().unwrap(), Stage::Planning);
    }

    #[test]
    fn appended_task_updates_are_folded_to_latest() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let mut task = Task::new("Build login form", Stage::Implement, "frontend", "developer", "t0");
        store.append_task(&task).unwrap();
        task.transition(mc_core::TaskStatus::InProgress, None, "t1".into()).unwrap();
        store.append_task(&task).unwrap();

        let tasks = store.read_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, mc_core::TaskStatus::InProgress);
    }

    #[test]
    fn gates_default_to_one_per_stage_when_absent() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let gates = store.read_gates().unwrap();
        assert_eq!(gates.len(), Stage::all().len());
    }

    #[test]
    fn checkpoint_round_trips_through_directory_bundle() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let cp = Checkpoint::new(Stage::Design, 0, "now", vec![], vec![]);
        store.write_checkpoint(&cp).unwrap();
        let loaded = store.read_checkpoint(&cp.id).unwrap();
        assert_eq!(loaded.id, cp.id);
    }

    #[test]
    fn checkpoint_index_increments_per_stage() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        assert_eq!(store.next_checkpoint_index(Stage::Design), 0);
        store.write_checkpoint(&Checkpoint::new(Stage::Design, 0, "now", vec![], vec![])).unwrap();
        assert_eq!(store.next_checkpoint_index(Stage::Design), 1);
        assert_eq!(store.next_checkpoint_index(Stage::Implement), 0);
    }

    #[test]
    fn audit_log_is_append_only_and_readable_with_limit() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        for i in 0..5 {
            store
                .append_audit(&AuditEntry::new(format!("t{i}"), "cli", "create", AuditCategory::Task, "mc-1"))
                .unwrap();
        }
        let tail = store.read_audit(Some(2)).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].timestamp, "t4");
    }
}
