// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token accounting: per-worker budgets and model-tier cost estimation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Healthy,
    Warning,
    Critical,
    Exceeded,
}

crate::simple_display! {
    TokenStatus {
        Healthy => "healthy",
        Warning => "warning",
        Critical => "critical",
        Exceeded => "exceeded",
    }
}

impl TokenStatus {
    pub fn from_ratio(used: u64, budget: u64) -> Self {
        if budget == 0 {
            return TokenStatus::Exceeded;
        }
        let ratio = used as f64 / budget as f64;
        if ratio > 1.0 {
            TokenStatus::Exceeded
        } else if ratio > 0.75 {
            TokenStatus::Critical
        } else if ratio > 0.5 {
            TokenStatus::Warning
        } else {
            TokenStatus::Healthy
        }
    }
}

/// Per-persona default model tier, consulted by [`ModelTier::for_persona`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Opus,
    Sonnet,
    Haiku,
}

crate::simple_display! {
    ModelTier {
        Opus => "opus",
        Sonnet => "sonnet",
        Haiku => "haiku",
    }
}

impl ModelTier {
    pub fn for_persona(persona: &str) -> Self {
        match persona {
            "king" => ModelTier::Opus,
            "reviewer" | "security" | "tester" => ModelTier::Haiku,
            _ => ModelTier::Sonnet,
        }
    }

    /// `(input_rate, output_rate)` in dollars per million tokens.
    pub fn rates(&self) -> (f64, f64) {
        match self {
            ModelTier::Opus => (15.0, 75.0),
            ModelTier::Sonnet => (3.0, 15.0),
            ModelTier::Haiku => (0.8, 4.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerTokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl WorkerTokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn cost_estimate(&self, tier: ModelTier) -> f64 {
        let (input_rate, output_rate) = tier.rates();
        (self.input_tokens as f64 / 1_000_000.0) * input_rate
            + (self.output_tokens as f64 / 1_000_000.0) * output_rate
    }
}

/// Aggregate budget tracked per worker (or globally). Threshold callbacks
/// should be edge-triggered by the caller on the *cumulative* total crossing
/// 80%/100%, exactly once each, never re-fired on subsequent records.
#[derive(Debug, Clone)]
pub struct TokenBudget {
    pub budget: u64,
    pub usage: WorkerTokenUsage,
    warned_80: bool,
    warned_100: bool,
}

impl TokenBudget {
    pub fn new(budget: u64) -> Self {
        Self { budget, usage: WorkerTokenUsage::default(), warned_80: false, warned_100: false }
    }

    pub fn status(&self) -> TokenStatus {
        TokenStatus::from_ratio(self.usage.total(), self.budget)
    }

    /// Record additional usage, returning which thresholds were newly crossed.
    pub fn record(&mut self, input: u64, output: u64) -> ThresholdCrossing {
        self.usage.input_tokens += input;
        self.usage.output_tokens += output;
        let total = self.usage.total();
        let mut crossing = ThresholdCrossing::default();
        if !self.warned_80 && self.budget > 0 && total as f64 >= 0.8 * self.budget as f64 {
            self.warned_80 = true;
            crossing.warning = true;
        }
        if !self.warned_100 && self.budget > 0 && total >= self.budget {
            self.warned_100 = true;
            crossing.critical = true;
        }
        crossing
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdCrossing {
    pub warning: bool,
    pub critical: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_fires_exactly_once_at_eighty_percent() {
        let mut budget = TokenBudget::new(100);
        assert_eq!(budget.record(70, 0), ThresholdCrossing { warning: false, critical: false });
        assert_eq!(budget.record(10, 0), ThresholdCrossing { warning: true, critical: false });
        assert_eq!(budget.record(5, 0), ThresholdCrossing { warning: false, critical: false });
    }

    #[test]
    fn critical_fires_exactly_once_at_budget() {
        let mut budget = TokenBudget::new(100);
        budget.record(90, 0);
        assert_eq!(budget.record(10, 0), ThresholdCrossing { warning: false, critical: true });
        assert_eq!(budget.record(50, 0), ThresholdCrossing { warning: false, critical: false });
    }

    #[test]
    fn model_tier_maps_persona() {
        assert_eq!(ModelTier::for_persona("king"), ModelTier::Opus);
        assert_eq!(ModelTier::for_persona("developer"), ModelTier::Sonnet);
        assert_eq!(ModelTier::for_persona("reviewer"), ModelTier::Haiku);
        assert_eq!(ModelTier::for_persona("anything-else"), ModelTier::Sonnet);
    }
}
