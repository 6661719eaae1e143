// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identifier and health classification.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a spawned worker process.
    pub struct WorkerId("wkr-");
}

/// Health of a supervised worker, evaluated each second from its last
/// activity/tool-call timestamps. See SPEC_FULL §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerHealth {
    Healthy,
    Idle,
    Stuck,
    Unresponsive,
    Dead,
}

crate::simple_display! {
    WorkerHealth {
        Healthy => "healthy",
        Idle => "idle",
        Stuck => "stuck",
        Unresponsive => "unresponsive",
        Dead => "dead",
    }
}

impl WorkerHealth {
    /// Classify from seconds-since-last-activity and process liveness, per the
    /// default thresholds in [`crate::config::Config`].
    pub fn classify(
        secs_since_activity: u64,
        process_alive: bool,
        stdin_write_failed: bool,
        idle_threshold_secs: u64,
        stuck_threshold_secs: u64,
    ) -> Self {
        if !process_alive {
            return WorkerHealth::Dead;
        }
        if secs_since_activity >= stuck_threshold_secs {
            if stdin_write_failed {
                return WorkerHealth::Unresponsive;
            }
            return WorkerHealth::Stuck;
        }
        if secs_since_activity >= idle_threshold_secs {
            return WorkerHealth::Idle;
        }
        WorkerHealth::Healthy
    }
}

/// Persisted registry entry for a currently-running worker. Lives in
/// `state/workers.json`, rewritten atomically by the State Store whenever
/// the Supervisor registers or deregisters a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub persona: String,
    pub zone: String,
    pub task_id: String,
    pub pid: Option<u32>,
    pub started_at: String,
    pub last_activity_at: String,
    pub health: WorkerHealth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_process_overrides_activity() {
        assert_eq!(WorkerHealth::classify(0, false, false, 30, 60), WorkerHealth::Dead);
    }

    #[test]
    fn stuck_with_failed_stdin_is_unresponsive() {
        assert_eq!(WorkerHealth::classify(61, true, true, 30, 60), WorkerHealth::Unresponsive);
    }

    #[test]
    fn thresholds_are_ordered() {
        assert_eq!(WorkerHealth::classify(5, true, false, 30, 60), WorkerHealth::Healthy);
        assert_eq!(WorkerHealth::classify(31, true, false, 30, 60), WorkerHealth::Idle);
        assert_eq!(WorkerHealth::classify(60, true, false, 30, 60), WorkerHealth::Stuck);
    }
}
