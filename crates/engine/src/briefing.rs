// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Briefing Compiler (C6): assembles the JSON a worker sees at spawn time,
//! trimming lowest-priority sections first to stay within a soft token
//! budget shared with C7's accounting.

use mc_core::Task;
use serde::Serialize;

use crate::tokens::estimate_tokens;

const SOFT_TOKEN_BUDGET: u64 = 300;
const MAX_KEY_REQUIREMENTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub task_description: String,
    pub key_requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessor_context: Option<String>,
    pub scope_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deep_dive_findings: Vec<String>,
}

/// Compile a briefing for `task`. `spec_requirements` is the caller-supplied
/// requirement list for the task's linked spec summary; `predecessor_context`
/// is the most recent `context_for_successor.recommended_approach` among the
/// task's done dependencies, if any; `finding_paths` are candidate deep-dive
/// file paths, trimmed first when the budget is tight.
pub fn compile(
    task: &Task,
    spec_requirements: &[String],
    predecessor_context: Option<String>,
    finding_paths: Vec<String>,
) -> Briefing {
    let mut briefing = Briefing {
        task_description: task.title.clone(),
        key_requirements: spec_requirements.iter().take(MAX_KEY_REQUIREMENTS).cloned().collect(),
        predecessor_context,
        scope_paths: task.scope_paths.iter().cloned().collect(),
        deep_dive_findings: finding_paths,
    };

    // Trim lowest-priority sections first: deep-dive links, then predecessor
    // gotchas, until the estimate fits the soft budget or nothing's left to cut.
    while estimated_size(&briefing) > SOFT_TOKEN_BUDGET && !briefing.deep_dive_findings.is_empty() {
        briefing.deep_dive_findings.pop();
    }
    if estimated_size(&briefing) > SOFT_TOKEN_BUDGET {
        briefing.predecessor_context = None;
    }

    briefing
}

fn estimated_size(briefing: &Briefing) -> u64 {
    let json = serde_json::to_string(briefing).unwrap_or_default();
    estimate_tokens(&json)
}
