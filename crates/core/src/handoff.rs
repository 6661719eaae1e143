// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker handoff: the terminal output of a worker's task.

use serde::{Deserialize, Serialize};

use crate::task::TaskId;
use crate::worker::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Complete,
    Blocked,
    Partial,
}

crate::simple_display! {
    HandoffStatus {
        Complete => "complete",
        Blocked => "blocked",
        Partial => "partial",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    Discovery,
    Blocker,
    Decision,
    Concern,
}

crate::simple_display! {
    FindingType {
        Discovery => "discovery",
        Blocker => "blocker",
        Decision => "decision",
        Concern => "concern",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingType,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

pub const MAX_FINDING_SUMMARY_CHARS: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextForSuccessor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_decisions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gotchas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_approach: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handoff {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub status: HandoffStatus,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_for_successor: Option<ContextForSuccessor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let h = Handoff {
            task_id: TaskId::from("mc-deadbeef01"),
            worker_id: WorkerId::new(),
            status: HandoffStatus::Complete,
            findings: vec![Finding {
                kind: FindingType::Discovery,
                summary: "found it".into(),
                details_path: None,
                severity: None,
            }],
            artifacts: vec!["src/login.rs".into()],
            timestamp: "2026-01-01T00:00:00Z".into(),
            blocked_reason: None,
            open_questions: vec![],
            context_for_successor: None,
        };
        let json = serde_json::to_string(&h).unwrap();
        let back: Handoff = serde_json::from_str(&json).unwrap();
        assert_eq!(back.task_id, h.task_id);
        assert_eq!(back.findings.len(), 1);
    }
}
