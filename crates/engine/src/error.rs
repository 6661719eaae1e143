// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mc_core::{GateError, TaskError};
use mc_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task error: {0}")]
    Task(#[from] TaskError),
    #[error("gate error: {0}")]
    Gate(#[from] GateError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("illegal stage transition: {0} is not open or {1} is not next({0})")]
    IllegalStageTransition(String, String),
    #[error("gate for {0} is not open")]
    GateNotOpen(String),
    #[error("handoff invalid: {0:?}")]
    InvalidHandoff(Vec<String>),
    #[error("criterion {criterion:?} for stage {stage} is not yet true of the live task set")]
    CriterionNotMet { stage: String, criterion: String },
    #[error("process enforcement violation: {0}")]
    ProcessViolation(String),
}
