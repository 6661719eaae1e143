// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Kernel: binds the State Store, Workflow Engine, Task Graph, Handoff
//! Validator, Token Accountant, and (optional) Git Commit adapter behind one
//! facade, mirroring the teacher's `Executor<S, A, N, C>` — generic over its
//! adapter, not over its storage, since there is exactly one State Store per
//! project.

use std::path::PathBuf;
use std::sync::Arc;

use mc_adapters::GitCommitAdapter;
use mc_core::{AuditCategory, AuditEntry, Gate, Handoff, Stage, Task, TaskId, TaskStatus};
use mc_storage::StateStore;
use parking_lot::Mutex;

use crate::error::EngineError;
use crate::graph::TaskGraph;
use crate::handoff::{task_status_for_handoff, validate};
use crate::tokens::TokenAccountant;
use crate::workflow::Workflow;

/// Categories for which an auto-commit is enabled. Configurable per
/// SPEC_FULL §4.12 / §4.16; the kernel only consults it, config loading
/// lives in `mc-daemon`.
#[derive(Debug, Clone, Default)]
pub struct GitCommitCategories(pub Vec<String>);

impl GitCommitCategories {
    pub fn enabled_for(&self, category: AuditCategory) -> bool {
        self.0.iter().any(|c| c.as_str() == category.to_string())
    }
}

pub struct Kernel<G: GitCommitAdapter> {
    store: StateStore,
    tokens: Mutex<TokenAccountant>,
    git: Option<Arc<G>>,
    git_categories: GitCommitCategories,
}

impl<G: GitCommitAdapter> Kernel<G> {
    pub fn new(root: impl Into<PathBuf>, global_token_budget: u64, worker_token_budget: u64) -> Self {
        Self {
            store: StateStore::open(root),
            tokens: Mutex::new(TokenAccountant::new(global_token_budget, worker_token_budget)),
            git: None,
            git_categories: GitCommitCategories::default(),
        }
    }

    pub fn with_git(mut self, git: Arc<G>, categories: GitCommitCategories) -> Self {
        self.git = Some(git);
        self.git_categories = categories;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn workflow(&self) -> Workflow<'_> {
        Workflow::new(&self.store)
    }

    pub fn graph(&self) -> TaskGraph<'_> {
        TaskGraph::new(&self.store)
    }

    pub fn tokens(&self) -> &Mutex<TokenAccountant> {
        &self.tokens
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_task(
        &self,
        actor: &str,
        title: impl Into<String>,
        stage: Stage,
        zone: impl Into<String>,
        persona: impl Into<String>,
        scope_paths: Vec<String>,
        deps: Vec<TaskId>,
        now: impl Into<String> + Clone,
    ) -> Result<TaskId, EngineError> {
        let id = self.graph().create(title, stage, zone, persona, scope_paths, deps, now.clone())?;
        self.audit(actor, "create", AuditCategory::Task, id.as_str(), None, now).await;
        Ok(id)
    }

    pub async fn update_task_status(
        &self,
        actor: &str,
        id: &TaskId,
        status: TaskStatus,
        reason: Option<String>,
        now: impl Into<String> + Clone,
    ) -> Result<Task, EngineError> {
        let task = self.graph().update_status(id, status, reason, now.clone())?;
        self.sync_gate_criteria()?;
        self.audit(actor, "update_status", AuditCategory::Task, id.as_str(), None, now).await;
        Ok(task)
    }

    /// Re-evaluate task-backed gate criteria against the live task set. Per
    /// C3, this runs on every task transition, not just when a client calls
    /// `satisfy_gate` — a tampered client can't skip it.
    fn sync_gate_criteria(&self) -> Result<(), EngineError> {
        let tasks = self.store.read_tasks()?;
        self.workflow().sync_task_backed_criteria(&tasks)
    }

    pub async fn add_task_dependency(&self, actor: &str, id: &TaskId, dep: &TaskId, now: impl Into<String> + Clone) -> Result<Task, EngineError> {
        let task = self.graph().add_dependency(id, dep, now.clone())?;
        self.audit(actor, "add_dependency", AuditCategory::Task, id.as_str(), Some(dep.to_string()), now).await;
        Ok(task)
    }

    pub async fn remove_task_dependency(&self, actor: &str, id: &TaskId, dep: &TaskId, now: impl Into<String> + Clone) -> Result<Task, EngineError> {
        let task = self.graph().remove_dependency(id, dep, now.clone())?;
        self.audit(actor, "remove_dependency", AuditCategory::Task, id.as_str(), Some(dep.to_string()), now).await;
        Ok(task)
    }

    /// Validate a handoff and, if it passes, apply it: write the raw
    /// handoff, append findings, and transition the task.
    pub async fn apply_handoff(
        &self,
        actor: &str,
        handoff: &Handoff,
        raw_bytes: &[u8],
        now: impl Into<String> + Clone,
    ) -> Result<Task, EngineError> {
        let task = self.store.read_task(&handoff.task_id)?;
        let errors = validate(handoff, task.as_ref());
        if !errors.is_empty() {
            return Err(EngineError::InvalidHandoff(errors.into_iter().map(|e| e.to_string()).collect()));
        }

        self.store.write_handoff(handoff.worker_id.as_str(), &handoff.timestamp, raw_bytes)?;
        for finding in &handoff.findings {
            self.store.write_finding(handoff.task_id.as_str(), &finding.summary)?;
        }

        let new_status = task_status_for_handoff(handoff.status);
        let reason = handoff.blocked_reason.clone();
        let updated = self.graph().update_status(&handoff.task_id, new_status, reason, now.clone())?;
        self.sync_gate_criteria()?;
        self.audit(actor, "apply_handoff", AuditCategory::Handoff, handoff.task_id.as_str(), None, now).await;
        Ok(updated)
    }

    pub async fn satisfy_gate(&self, actor: &str, stage: Stage, criterion: &str, now: impl Into<String> + Clone) -> Result<Gate, EngineError> {
        let gate = self.workflow().satisfy(stage, criterion)?;
        self.audit(actor, "satisfy", AuditCategory::Gate, &stage.gate_id(), Some(criterion.to_string()), now).await;
        Ok(gate)
    }

    /// Approve a gate and take the auto-checkpoint this triggers.
    pub async fn approve_gate(&self, actor: &str, stage: Stage, now: impl Into<String> + Clone) -> Result<Gate, EngineError> {
        let gate = self.workflow().approve(stage, actor, now.clone())?;
        self.audit(actor, "approve", AuditCategory::Gate, &stage.gate_id(), None, now.clone()).await;

        let tasks = self.store.read_tasks()?;
        let index = self.store.next_checkpoint_index(stage);
        let checkpoint = mc_core::Checkpoint::new(stage, index, now.clone(), tasks, vec![]);
        self.store.write_checkpoint(&checkpoint)?;
        self.audit(actor, "auto_checkpoint", AuditCategory::Checkpoint, &checkpoint.id, None, now).await;
        Ok(gate)
    }

    /// Snapshot the live task set under the current stage.
    pub async fn create_checkpoint(&self, actor: &str, now: impl Into<String> + Clone) -> Result<mc_core::Checkpoint, EngineError> {
        let stage = self.workflow().current()?;
        let tasks = self.store.read_tasks()?;
        let index = self.store.next_checkpoint_index(stage);
        let checkpoint = mc_core::Checkpoint::new(stage, index, now.clone(), tasks, vec![]);
        self.store.write_checkpoint(&checkpoint)?;
        self.audit(actor, "create_checkpoint", AuditCategory::Checkpoint, &checkpoint.id, None, now).await;
        Ok(checkpoint)
    }

    /// Restore the stage cursor and task list from a checkpoint bundle.
    pub async fn restart_from_checkpoint(&self, actor: &str, id: &str, now: impl Into<String> + Clone) -> Result<mc_core::Checkpoint, EngineError> {
        let checkpoint = self.store.read_checkpoint(id)?;
        self.store.write_stage(checkpoint.stage, now.clone())?;
        for task in &checkpoint.tasks {
            self.store.append_task(task)?;
        }
        self.sync_gate_criteria()?;
        self.audit(actor, "restart", AuditCategory::Checkpoint, &checkpoint.id, None, now).await;
        Ok(checkpoint)
    }

    /// Process-enforcement check backing `commit --validate-only`: re-derive
    /// task-backed criteria from live tasks, then confirm the current
    /// stage's gate is in the state a commit should require. `strict`
    /// additionally demands the gate be approved, not merely satisfied.
    pub fn validate_process(&self, strict: bool) -> Result<(), EngineError> {
        let stage = self.workflow().current()?;
        let tasks = self.store.read_tasks()?;
        self.workflow().sync_task_backed_criteria(&tasks)?;
        let gate = self.workflow().check(stage)?;
        if !gate.all_satisfied() {
            return Err(EngineError::ProcessViolation(format!("gate for {stage} has unsatisfied criteria")));
        }
        if strict && !gate.is_open() {
            return Err(EngineError::ProcessViolation(format!("gate for {stage} is satisfied but not yet approved")));
        }
        Ok(())
    }

    pub async fn commit(&self, actor: &str, category: AuditCategory, paths: &[PathBuf], summary: &str, now: impl Into<String>) {
        let now = now.into();
        if !self.git_categories.enabled_for(category) {
            return;
        }
        let Some(git) = &self.git else { return };
        match git.commit(paths, &category.to_string(), summary).await {
            Ok(commit_id) => {
                let entry = AuditEntry::new(now, actor, "commit", AuditCategory::Commit, commit_id);
                let _ = self.store.append_audit(&entry);
            }
            Err(e) => {
                tracing::warn!(error = %e, "git commit failed; mutation was not rolled back");
                let entry = AuditEntry::new(now, actor, "commit_failed", AuditCategory::Commit, category.to_string())
                    .with_details(e.to_string());
                let _ = self.store.append_audit(&entry);
            }
        }
    }

    async fn audit(&self, actor: &str, action: &str, category: AuditCategory, target: &str, details: Option<String>, now: impl Into<String>) {
        let mut entry = AuditEntry::new(now.into(), actor, action, category, target);
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        if let Err(e) = self.store.append_audit(&entry) {
            tracing::warn!(error = %e, "audit write failed; primary mutation already succeeded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_adapters::fake::FakeGitCommitAdapter;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creating_a_task_appends_one_audit_entry() {
        let dir = tempdir().unwrap();
        let kernel: Kernel<FakeGitCommitAdapter> = Kernel::new(dir.path(), 1_000_000, 100_000);
        kernel
            .create_task("cli", "Build login form", Stage::Implement, "frontend", "developer", vec![], vec![], "t0")
            .await
            .unwrap();
        let audit = kernel.store().read_audit(None).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "create");
    }

    #[tokio::test]
    async fn approving_a_gate_writes_a_checkpoint() {
        let dir = tempdir().unwrap();
        let kernel: Kernel<FakeGitCommitAdapter> = Kernel::new(dir.path(), 1_000_000, 100_000);
        for criterion in Stage::Discovery.default_criteria() {
            kernel.satisfy_gate("cli", Stage::Discovery, criterion, "t0").await.unwrap();
        }
        kernel.approve_gate("operator", Stage::Discovery, "t1").await.unwrap();
        assert_eq!(kernel.store().next_checkpoint_index(Stage::Discovery), 1);
    }

    #[tokio::test]
    async fn invalid_handoff_does_not_mutate_task_status() {
        let dir = tempdir().unwrap();
        let kernel: Kernel<FakeGitCommitAdapter> = Kernel::new(dir.path(), 1_000_000, 100_000);
        let id = kernel
            .create_task("cli", "Build login form", Stage::Implement, "frontend", "developer", vec![], vec![], "t0")
            .await
            .unwrap();

        let handoff = Handoff {
            task_id: id.clone(),
            worker_id: mc_core::WorkerId::new(),
            status: mc_core::HandoffStatus::Blocked,
            findings: vec![],
            artifacts: vec![],
            timestamp: "t1".to_string(),
            blocked_reason: None, // invalid: blocked without a reason
            open_questions: vec![],
            context_for_successor: None,
        };
        let err = kernel.apply_handoff("wkr-abc", &handoff, b"{}", "t1").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidHandoff(_)));

        let task = kernel.store().read_task(&id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Ready);
    }

    #[tokio::test]
    async fn restart_from_checkpoint_restores_stage_and_tasks() {
        let dir = tempdir().unwrap();
        let kernel: Kernel<FakeGitCommitAdapter> = Kernel::new(dir.path(), 1_000_000, 100_000);
        kernel
            .create_task("cli", "Build login form", Stage::Implement, "frontend", "developer", vec![], vec![], "t0")
            .await
            .unwrap();
        let checkpoint = kernel.create_checkpoint("cli", "t1").await.unwrap();

        kernel
            .update_task_status(
                "cli",
                &kernel.store().read_tasks().unwrap()[0].id.clone(),
                TaskStatus::InProgress,
                None,
                "t2",
            )
            .await
            .unwrap();
        kernel.store().write_stage(Stage::Goal, "t2").unwrap();

        let restored = kernel.restart_from_checkpoint("cli", &checkpoint.id, "t3").await.unwrap();
        assert_eq!(restored.stage, Stage::Implement);
        assert_eq!(kernel.workflow().current().unwrap(), Stage::Implement);
        assert_eq!(kernel.store().read_tasks().unwrap()[0].status, TaskStatus::Ready);
    }

    #[tokio::test]
    async fn validate_process_reports_unsatisfied_criteria_as_a_violation() {
        let dir = tempdir().unwrap();
        let kernel: Kernel<FakeGitCommitAdapter> = Kernel::new(dir.path(), 1_000_000, 100_000);
        let err = kernel.validate_process(false).unwrap_err();
        assert!(matches!(err, EngineError::ProcessViolation(_)));
    }

    #[tokio::test]
    async fn validate_process_strict_requires_approval_not_just_satisfaction() {
        let dir = tempdir().unwrap();
        let kernel: Kernel<FakeGitCommitAdapter> = Kernel::new(dir.path(), 1_000_000, 100_000);
        for criterion in Stage::Discovery.default_criteria() {
            kernel.satisfy_gate("cli", Stage::Discovery, criterion, "t0").await.unwrap();
        }
        kernel.validate_process(false).unwrap();
        assert!(kernel.validate_process(true).is_err());

        kernel.approve_gate("operator", Stage::Discovery, "t1").await.unwrap();
        kernel.validate_process(true).unwrap();
    }

    #[tokio::test]
    async fn git_commit_failure_is_audited_not_fatal() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(FakeGitCommitAdapter::default());
        let kernel = Kernel::new(dir.path(), 1_000_000, 100_000)
            .with_git(adapter.clone(), GitCommitCategories(vec!["task".to_string()]));
        kernel.commit("cli", AuditCategory::Task, &[], "create mc-1", "t0").await;
        assert_eq!(adapter.calls().len(), 1);
        let audit = kernel.store().read_audit(None).unwrap();
        assert_eq!(audit[0].action, "commit");
    }
}
