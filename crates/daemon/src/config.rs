// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration load (C16): defaults -> `.mission/config.toml` ->
//! `MC_*` environment -> CLI flags. Grounded on the teacher's `toml`
//! dependency (there used for runbook parsing, repurposed here) and
//! `clap`'s `env` feature for the overlay.

use std::path::Path;

use mc_core::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("malformed config.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// CLI-flag overrides, populated by clap in `main.rs`. Each field is `None`
/// when the flag wasn't passed, so it doesn't shadow a lower layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub poll_interval_ms: Option<u64>,
    pub log_level: Option<String>,
}

pub fn load(mission_root: &Path, overrides: &CliOverrides) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    let config_path = mission_root.join("config.toml");
    if config_path.exists() {
        let text = std::fs::read_to_string(&config_path)
            .map_err(|source| ConfigError::Read { path: config_path.display().to_string(), source })?;
        let from_file: Config = toml::from_str(&text)?;
        config = from_file;
    }

    apply_env(&mut config)?;

    if let Some(poll_interval_ms) = overrides.poll_interval_ms {
        config.poll_interval_ms = poll_interval_ms;
    }
    if let Some(log_level) = &overrides.log_level {
        config.log_level = log_level.clone();
    }

    Ok(config)
}

fn apply_env(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var("MC_POLL_INTERVAL_MS") {
        config.poll_interval_ms = parse_env("MC_POLL_INTERVAL_MS", &value)?;
    }
    if let Ok(value) = std::env::var("MC_IDLE_THRESHOLD_SECS") {
        config.idle_threshold_secs = parse_env("MC_IDLE_THRESHOLD_SECS", &value)?;
    }
    if let Ok(value) = std::env::var("MC_STUCK_THRESHOLD_SECS") {
        config.stuck_threshold_secs = parse_env("MC_STUCK_THRESHOLD_SECS", &value)?;
    }
    if let Ok(value) = std::env::var("MC_GLOBAL_TOKEN_BUDGET") {
        config.global_token_budget = parse_env("MC_GLOBAL_TOKEN_BUDGET", &value)?;
    }
    if let Ok(value) = std::env::var("MC_GIT_COMMIT_CATEGORIES") {
        config.git_commit_categories = value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Ok(value) = std::env::var("MC_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Ok(value) = std::env::var("MC_LOG_FORMAT") {
        config.log_format = match value.as_str() {
            "json" => mc_core::config::LogFormat::Json,
            "pretty" => mc_core::config::LogFormat::Pretty,
            _ => return Err(ConfigError::InvalidEnv { var: "MC_LOG_FORMAT", value }),
        };
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv { var, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_when_no_file_or_env_present() {
        let dir = tempdir().unwrap();
        let config = load(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_toml_overrides_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "poll_interval_ms = 250\n").unwrap();
        let config = load(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn cli_override_wins_over_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "poll_interval_ms = 250\n").unwrap();
        let overrides = CliOverrides { poll_interval_ms: Some(10), log_level: None };
        let config = load(dir.path(), &overrides).unwrap();
        assert_eq!(config.poll_interval_ms, 10);
    }
}
