// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task entity: the unit the workflow engine and task graph schedule.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash_id::short_id;
use crate::stage::Stage;

/// Task identifier, derived from content so identical logical tasks dedup.
/// See [`crate::hash_id::short_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn derive(title: &str, stage: Stage, zone: &str, persona: &str) -> Self {
        Self(short_id("mc", &[title, stage.as_str(), zone, persona]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    InProgress,
    Blocked,
    Done,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Ready => "ready",
        InProgress => "in_progress",
        Blocked => "blocked",
        Done => "done",
    }
}

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("dependency {0} not found")]
    UnknownDependency(String),
    #[error("adding dependency {dep} to {task} would create a cycle")]
    Cycle { task: String, dep: String },
    #[error("cannot transition task {id} from {from} to {to}")]
    IllegalTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
    #[error("status must be blocked to set a blocked_reason")]
    BlockedReasonWithoutBlockedStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub stage: Stage,
    pub zone: String,
    pub persona: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    #[serde(default)]
    pub scope_paths: BTreeSet<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    /// Construct a task, stamping `created_at`/`updated_at` with `now` (an
    /// RFC3339 timestamp obtained from a [`crate::clock::Clock`] at the call
    /// site, never captured internally, so tests stay deterministic).
    pub fn new(
        title: impl Into<String>,
        stage: Stage,
        zone: impl Into<String>,
        persona: impl Into<String>,
        now: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let zone = zone.into();
        let persona = persona.into();
        let id = TaskId::derive(&title, stage, &zone, &persona);
        let now = now.into();
        Self {
            id,
            title,
            stage,
            zone,
            persona,
            status: TaskStatus::Pending,
            blocked_reason: None,
            dependencies: BTreeSet::new(),
            scope_paths: BTreeSet::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn with_scope_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.scope_paths.extend(paths);
        self
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// Legal task status transitions, per SPEC_FULL §4.4.
    pub fn can_transition(&self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self.status, to),
            (Pending, Ready)
                | (Pending, InProgress)
                | (Ready, InProgress)
                | (InProgress, Done)
                | (InProgress, Blocked)
                | (InProgress, Pending) // "partial" handoff returns task to pending
                | (Blocked, Ready)
        )
    }

    pub fn transition(&mut self, to: TaskStatus, reason: Option<String>, now: String) -> Result<(), TaskError> {
        if !self.can_transition(to) {
            return Err(TaskError::IllegalTransition {
                id: self.id.to_string(),
                from: self.status,
                to,
            });
        }
        if to == TaskStatus::Blocked && reason.is_none() {
            return Err(TaskError::BlockedReasonWithoutBlockedStatus);
        }
        self.status = to;
        self.blocked_reason = if to == TaskStatus::Blocked { reason } else { None };
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_fields_dedup_to_same_id() {
        let a = Task::new("Build login form", Stage::Implement, "frontend", "developer", "2026-01-01T00:00:00Z");
        let b = Task::new("Build login form", Stage::Implement, "frontend", "developer", "2026-01-01T00:00:00Z");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn different_zone_yields_different_id() {
        let a = Task::new("Build login form", Stage::Implement, "frontend", "developer", "2026-01-01T00:00:00Z");
        let b = Task::new("Build login form", Stage::Implement, "backend", "developer", "2026-01-01T00:00:00Z");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn pending_to_in_progress_to_done_is_legal() {
        let mut t = Task::new("x", Stage::Implement, "z", "developer", "2026-01-01T00:00:00Z");
        assert!(t.transition(TaskStatus::InProgress, None, "now".into()).is_ok());
        assert!(t.transition(TaskStatus::Done, None, "now".into()).is_ok());
        assert!(t.is_done());
    }

    #[test]
    fn done_to_pending_is_illegal() {
        let mut t = Task::new("x", Stage::Implement, "z", "developer", "2026-01-01T00:00:00Z");
        t.transition(TaskStatus::InProgress, None, "now".into()).unwrap();
        t.transition(TaskStatus::Done, None, "now".into()).unwrap();
        assert!(t.transition(TaskStatus::Pending, None, "now".into()).is_err());
    }

    #[test]
    fn blocked_requires_reason() {
        let mut t = Task::new("x", Stage::Implement, "z", "developer", "2026-01-01T00:00:00Z");
        t.transition(TaskStatus::InProgress, None, "now".into()).unwrap();
        let err = t.transition(TaskStatus::Blocked, None, "now".into()).unwrap_err();
        assert_eq!(err, TaskError::BlockedReasonWithoutBlockedStatus);
    }
}
