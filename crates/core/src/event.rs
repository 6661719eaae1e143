// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic events emitted by the watcher and fanned out by the event hub.

use serde::{Deserialize, Serialize};

use crate::gate::GateStatus;
use crate::stage::Stage;
use crate::task::{Task, TaskId, TaskStatus};
use crate::worker::WorkerId;

/// Events published on [`crate::event::Event`]'s topics. Serializes as
/// `{"type": "task_created", ...}`; unknown tags deserialize to `Custom` so
/// older subscribers tolerate newer publishers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "stage_changed")]
    StageChanged { previous: Stage, current: Stage },

    #[serde(rename = "task_created")]
    TaskCreated { task: Task },

    #[serde(rename = "task_updated")]
    TaskUpdated {
        task_id: TaskId,
        status: TaskStatus,
        previous: TaskStatus,
    },

    #[serde(rename = "gate_ready")]
    GateReady { stage: Stage },

    #[serde(rename = "gate_approved")]
    GateApproved { stage: Stage, approved_at: String, approved_by: String },

    #[serde(rename = "gate_status_changed")]
    GateStatusChanged { stage: Stage, status: GateStatus },

    #[serde(rename = "worker_spawned")]
    WorkerSpawned {
        worker_id: WorkerId,
        persona: String,
        zone: String,
        task_id: TaskId,
    },

    #[serde(rename = "worker_completed")]
    WorkerCompleted { worker_id: WorkerId, task_id: TaskId },

    #[serde(rename = "worker_status_changed")]
    WorkerStatusChanged { worker_id: WorkerId, health: String },

    #[serde(rename = "findings_ready")]
    FindingsReady { task_id: TaskId },

    #[serde(rename = "handoff_created")]
    HandoffCreated { task_id: TaskId, worker_id: WorkerId },

    #[serde(rename = "handoff_validated")]
    HandoffValidated { task_id: TaskId, worker_id: WorkerId, accepted: bool },

    #[serde(rename = "token_warning")]
    TokenWarning { worker_id: WorkerId, used: u64, budget: u64 },

    #[serde(rename = "token_critical")]
    TokenCritical { worker_id: WorkerId, used: u64, budget: u64 },

    #[serde(rename = "checkpoint_created")]
    CheckpointCreated { id: String, stage: Stage },

    #[serde(rename = "session_restarted")]
    SessionRestarted { checkpoint_id: String },

    /// Catch-all for unknown event types (forward compatibility).
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// Topic this event is published under, consulted by the event hub's
    /// per-topic `tokio::sync::broadcast` channels.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::StageChanged { .. } => "stage",
            Event::TaskCreated { .. } | Event::TaskUpdated { .. } => "tasks",
            Event::GateReady { .. } | Event::GateApproved { .. } | Event::GateStatusChanged { .. } => "gates",
            Event::WorkerSpawned { .. } | Event::WorkerCompleted { .. } | Event::WorkerStatusChanged { .. } => "workers",
            Event::FindingsReady { .. } | Event::HandoffCreated { .. } | Event::HandoffValidated { .. } => "findings",
            Event::TokenWarning { .. } | Event::TokenCritical { .. } => "tokens",
            Event::CheckpointCreated { .. } | Event::SessionRestarted { .. } => "checkpoints",
            Event::Custom => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::StageChanged { previous: Stage::Discovery, current: Stage::Goal };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage_changed");
    }

    #[test]
    fn unknown_tag_deserializes_to_custom() {
        let event: Event = serde_json::from_str(r#"{"type":"something_new"}"#).unwrap();
        assert!(matches!(event, Event::Custom));
    }

    #[test]
    fn topic_routes_task_events_to_tasks() {
        let task = Task::new("x", Stage::Implement, "z", "developer", "now");
        let event = Event::TaskCreated { task };
        assert_eq!(event.topic(), "tasks");
    }
}
