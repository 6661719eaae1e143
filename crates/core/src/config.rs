// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel configuration values. Layered loading (defaults -> `config.toml` ->
//! `MC_*` env vars -> CLI flags) lives in `mc-daemon::config`, which is the
//! only place in the tree that touches the filesystem or environment; this
//! type is the plain value the rest of the kernel consumes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watcher poll interval, milliseconds.
    pub poll_interval_ms: u64,
    /// Seconds of worker inactivity before health becomes `idle`.
    pub idle_threshold_secs: u64,
    /// Seconds of worker inactivity before health becomes `stuck`.
    pub stuck_threshold_secs: u64,
    /// Global token budget across all workers.
    pub global_token_budget: u64,
    /// Default per-worker token budget.
    pub worker_token_budget: u64,
    /// Categories that trigger an automatic git commit on a successful mutation.
    pub git_commit_categories: Vec<String>,
    /// Gateway endpoint URL, if the gateway bridge is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_endpoint: Option<String>,
    /// Path to the persisted device keypair used for the gateway handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_device_key_path: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            idle_threshold_secs: 30,
            stuck_threshold_secs: 60,
            global_token_budget: 1_000_000,
            worker_token_budget: 100_000,
            git_commit_categories: Vec::new(),
            gateway_endpoint: None,
            gateway_device_key_path: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_thresholds() {
        let cfg = Config::default();
        assert_eq!(cfg.poll_interval_ms, 500);
        assert_eq!(cfg.idle_threshold_secs, 30);
        assert_eq!(cfg.stuck_threshold_secs, 60);
    }
}
