// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit log entries: the append-only interaction record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Task,
    Gate,
    Stage,
    Worker,
    Handoff,
    Commit,
    Checkpoint,
}

crate::simple_display! {
    AuditCategory {
        Task => "task",
        Gate => "gate",
        Stage => "stage",
        Worker => "worker",
        Handoff => "handoff",
        Commit => "commit",
        Checkpoint => "checkpoint",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub category: AuditCategory,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AuditEntry {
    pub fn new(
        timestamp: impl Into<String>,
        actor: impl Into<String>,
        action: impl Into<String>,
        category: AuditCategory,
        target: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            actor: actor.into(),
            action: action.into(),
            category,
            target: target.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
