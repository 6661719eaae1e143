// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token Accounting (C7): a shared, dependency-free character-count token
//! heuristic plus per-worker/global budget bookkeeping on top of
//! [`mc_core::token`].

use std::collections::HashMap;

use mc_core::{ModelTier, ThresholdCrossing, TokenBudget, WorkerId, WorkerTokenUsage};

/// ~4 characters per token, rounded up. The compiler (C6) and the
/// accountant (C7) both call this so their estimates agree.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4)
}

/// Tracks token usage per worker and against the global project budget.
pub struct TokenAccountant {
    global: TokenBudget,
    per_worker: HashMap<WorkerId, (WorkerTokenUsage, TokenBudget)>,
    worker_budget: u64,
}

impl TokenAccountant {
    pub fn new(global_budget: u64, worker_budget: u64) -> Self {
        Self { global: TokenBudget::new(global_budget), per_worker: HashMap::new(), worker_budget }
    }

    /// Record a turn's usage for `worker`. Returns the crossings fired by
    /// the global budget and, separately, by that worker's own budget.
    pub fn record(&mut self, worker: WorkerId, input_tokens: u64, output_tokens: u64) -> (ThresholdCrossing, ThresholdCrossing) {
        let global_crossing = self.global.record(input_tokens, output_tokens);
        let entry = self
            .per_worker
            .entry(worker)
            .or_insert_with(|| (WorkerTokenUsage::default(), TokenBudget::new(self.worker_budget)));
        entry.0.input_tokens += input_tokens;
        entry.0.output_tokens += output_tokens;
        let worker_crossing = entry.1.record(input_tokens, output_tokens);
        (global_crossing, worker_crossing)
    }

    pub fn worker_usage(&self, worker: &WorkerId) -> Option<&WorkerTokenUsage> {
        self.per_worker.get(worker).map(|(usage, _)| usage)
    }

    pub fn global_status(&self) -> mc_core::TokenStatus {
        self.global.status()
    }

    pub fn cost_estimate(&self, worker: &WorkerId, persona: &str) -> Option<f64> {
        self.worker_usage(worker).map(|usage| usage.cost_estimate(ModelTier::for_persona(persona)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn global_threshold_crossing_is_independent_of_per_worker() {
        let mut acct = TokenAccountant::new(100, 1_000);
        let worker = WorkerId::new();
        let (global, per_worker) = acct.record(worker, 85, 0);
        assert!(global.warning);
        assert!(!per_worker.warning);
    }
}
