// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders, gated behind `test-support`, mirroring the teacher's
//! `#[cfg(any(test, feature = "test-support"))]` convention so other crates'
//! tests can construct entities without re-deriving defaults by hand.

use crate::gate::Gate;
use crate::stage::Stage;
use crate::task::{Task, TaskStatus};

pub struct TaskBuilder {
    title: String,
    stage: Stage,
    zone: String,
    persona: String,
    now: String,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self {
            title: "test task".to_string(),
            stage: Stage::Implement,
            zone: "backend".to_string(),
            persona: "developer".to_string(),
            now: "2026-01-01T00:00:00Z".to_string(),
        }
    }
}

impl TaskBuilder {
    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.title = v.into();
        self
    }

    pub fn stage(mut self, v: Stage) -> Self {
        self.stage = v;
        self
    }

    pub fn zone(mut self, v: impl Into<String>) -> Self {
        self.zone = v.into();
        self
    }

    pub fn persona(mut self, v: impl Into<String>) -> Self {
        self.persona = v.into();
        self
    }

    pub fn now(mut self, v: impl Into<String>) -> Self {
        self.now = v.into();
        self
    }

    pub fn build(self) -> Task {
        Task::new(self.title, self.stage, self.zone, self.persona, self.now)
    }
}

impl Task {
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }
}

pub fn ready_task(now: &str) -> Task {
    let mut task = Task::builder().now(now).build();
    task.status = TaskStatus::Ready;
    task.updated_at = now.to_string();
    task
}

pub fn gate_awaiting_approval(stage: Stage) -> Gate {
    let mut gate = Gate::new(stage);
    for criterion in &mut gate.criteria {
        criterion.satisfied = true;
    }
    gate.status = crate::gate::GateStatus::AwaitingApproval;
    gate
}
