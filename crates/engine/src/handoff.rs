// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff Validator (C5): a pure function over a handoff and the current
//! state. Never mutates on its own — the kernel facade applies the state
//! change only after validation succeeds.

use mc_core::{Handoff, HandoffStatus, Task, TaskId, MAX_FINDING_SUMMARY_CHARS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffValidationError {
    UnknownTask(String),
    MissingBlockedReason,
    BlockedReasonOnNonBlocked,
    FindingSummaryTooLong { index: usize, len: usize },
    ArtifactOutOfScope { path: String },
}

impl std::fmt::Display for HandoffValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTask(id) => write!(f, "task {id} does not exist"),
            Self::MissingBlockedReason => write!(f, "status is blocked but blocked_reason is absent"),
            Self::BlockedReasonOnNonBlocked => write!(f, "blocked_reason is set but status is not blocked"),
            Self::FindingSummaryTooLong { index, len } => {
                write!(f, "finding {index} summary is {len} chars, exceeds {MAX_FINDING_SUMMARY_CHARS}")
            }
            Self::ArtifactOutOfScope { path } => write!(f, "artifact path {path} is outside the task's scope_paths"),
        }
    }
}

/// Validate a handoff against the task it targets. Returns every violation
/// found (not just the first) so a worker can fix its output in one pass.
pub fn validate(handoff: &Handoff, task: Option<&Task>) -> Vec<HandoffValidationError> {
    let mut errors = Vec::new();

    let Some(task) = task else {
        errors.push(HandoffValidationError::UnknownTask(handoff.task_id.to_string()));
        return errors;
    };

    match (handoff.status, &handoff.blocked_reason) {
        (HandoffStatus::Blocked, None) => errors.push(HandoffValidationError::MissingBlockedReason),
        (status, Some(_)) if status != HandoffStatus::Blocked => {
            errors.push(HandoffValidationError::BlockedReasonOnNonBlocked)
        }
        _ => {}
    }

    for (index, finding) in handoff.findings.iter().enumerate() {
        if finding.summary.chars().count() > MAX_FINDING_SUMMARY_CHARS {
            errors.push(HandoffValidationError::FindingSummaryTooLong { index, len: finding.summary.chars().count() });
        }
    }

    if !task.scope_paths.is_empty() {
        for artifact in &handoff.artifacts {
            let in_scope = task.scope_paths.iter().any(|scope| scope_matches(artifact, scope));
            if !in_scope {
                errors.push(HandoffValidationError::ArtifactOutOfScope { path: artifact.clone() });
            }
        }
    }

    errors
}

/// Match an artifact path against a `scope_paths` entry. A trailing `/**`
/// denotes "this directory and everything under it"; anything else is a
/// literal prefix.
fn scope_matches(artifact: &str, scope: &str) -> bool {
    match scope.strip_suffix("/**") {
        Some(prefix) => artifact == prefix || artifact.starts_with(&format!("{prefix}/")),
        None => artifact.starts_with(scope),
    }
}

/// Map a validated handoff's status to the task status transition the
/// kernel should apply.
pub fn task_status_for_handoff(status: HandoffStatus) -> mc_core::TaskStatus {
    match status {
        HandoffStatus::Complete => mc_core::TaskStatus::Done,
        HandoffStatus::Blocked => mc_core::TaskStatus::Blocked,
        HandoffStatus::Partial => mc_core::TaskStatus::Pending,
    }
}
