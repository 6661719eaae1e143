// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed ten-stage workflow cursor.

use serde::{Deserialize, Serialize};

/// One of the ten fixed positions in the workflow cursor. The set is closed:
/// no component may extend it at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovery,
    Goal,
    Requirements,
    Planning,
    Design,
    Implement,
    Verify,
    Validate,
    Document,
    Release,
}

crate::simple_display! {
    Stage {
        Discovery => "discovery",
        Goal => "goal",
        Requirements => "requirements",
        Planning => "planning",
        Design => "design",
        Implement => "implement",
        Verify => "verify",
        Validate => "validate",
        Document => "document",
        Release => "release",
    }
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Discovery,
        Stage::Goal,
        Stage::Requirements,
        Stage::Planning,
        Stage::Design,
        Stage::Implement,
        Stage::Verify,
        Stage::Validate,
        Stage::Document,
        Stage::Release,
    ];

    pub fn all() -> &'static [Stage; 10] {
        &Self::ALL
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Goal => "goal",
            Stage::Requirements => "requirements",
            Stage::Planning => "planning",
            Stage::Design => "design",
            Stage::Implement => "implement",
            Stage::Verify => "verify",
            Stage::Validate => "validate",
            Stage::Document => "document",
            Stage::Release => "release",
        }
    }

    /// Stage-local gate id, e.g. `gate-implement`.
    pub fn gate_id(&self) -> String {
        format!("gate-{}", self.as_str())
    }

    /// Next stage in sequence, or `None` after `release`.
    pub fn next(&self) -> Option<Stage> {
        let idx = Self::ALL.iter().position(|s| s == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// Parse from the on-disk / CLI string form.
    pub fn parse(s: &str) -> Option<Stage> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Default gate criteria enforced for this stage, consulted by the workflow
    /// engine each time a task transitions within it.
    pub fn default_criteria(&self) -> &'static [&'static str] {
        match self {
            Stage::Discovery => &["problem statement recorded"],
            Stage::Goal => &["goal approved"],
            Stage::Requirements => &["requirements drafted", "requirements reviewed"],
            Stage::Planning => &["plan drafted"],
            Stage::Design => &["design reviewed"],
            Stage::Implement => &["integrator task done"],
            Stage::Verify => &["reviewer task done", "security task done", "tester task done"],
            Stage::Validate => &["acceptance checked"],
            Stage::Document => &["docs written"],
            Stage::Release => &["release checklist complete"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_total_except_release() {
        for stage in Stage::all() {
            if *stage == Stage::Release {
                assert_eq!(stage.next(), None);
            } else {
                assert!(stage.next().is_some());
            }
        }
    }

    #[test]
    fn parse_round_trips_as_str() {
        for stage in Stage::all() {
            assert_eq!(Stage::parse(stage.as_str()), Some(*stage));
        }
        assert_eq!(Stage::parse("bogus"), None);
    }

    #[test]
    fn order_is_fixed() {
        assert_eq!(Stage::Discovery.next(), Some(Stage::Goal));
        assert_eq!(Stage::Verify.next(), Some(Stage::Validate));
        assert_eq!(Stage::Document.next(), Some(Stage::Release));
    }

    #[test]
    fn gate_id_format() {
        assert_eq!(Stage::Implement.gate_id(), "gate-implement");
    }
}
