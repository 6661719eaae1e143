// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate: the named-criteria guard on a stage transition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Closed,
    AwaitingApproval,
    Open,
}

crate::simple_display! {
    GateStatus {
        Closed => "closed",
        AwaitingApproval => "awaiting_approval",
        Open => "open",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub description: String,
    pub satisfied: bool,
}

impl Criterion {
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), satisfied: false }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("no criterion named {0:?} on this gate")]
    UnknownCriterion(String),
    #[error("gate for {0} is not awaiting approval")]
    NotAwaitingApproval(String),
    #[error("gate for {0} is already open")]
    AlreadyOpen(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub stage: Stage,
    pub status: GateStatus,
    pub criteria: Vec<Criterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
}

impl Gate {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            status: GateStatus::Closed,
            criteria: stage.default_criteria().iter().map(|c| Criterion::new(*c)).collect(),
            approved_at: None,
            approved_by: None,
        }
    }

    pub fn id(&self) -> String {
        self.stage.gate_id()
    }

    pub fn all_satisfied(&self) -> bool {
        self.criteria.iter().all(|c| c.satisfied)
    }

    /// Mark a named criterion satisfied; transitions `closed -> awaiting_approval`
    /// the moment every criterion becomes true.
    pub fn satisfy(&mut self, criterion: &str) -> Result<(), GateError> {
        let found = self
            .criteria
            .iter_mut()
            .find(|c| c.description == criterion)
            .ok_or_else(|| GateError::UnknownCriterion(criterion.to_string()))?;
        found.satisfied = true;
        if self.status == GateStatus::Closed && self.all_satisfied() {
            self.status = GateStatus::AwaitingApproval;
        }
        Ok(())
    }

    pub fn approve(&mut self, by: impl Into<String>, now: impl Into<String>) -> Result<(), GateError> {
        if self.status == GateStatus::Open {
            return Err(GateError::AlreadyOpen(self.stage.to_string()));
        }
        if self.status != GateStatus::AwaitingApproval {
            return Err(GateError::NotAwaitingApproval(self.stage.to_string()));
        }
        self.status = GateStatus::Open;
        self.approved_at = Some(now.into());
        self.approved_by = Some(by.into());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status == GateStatus::Open
    }
}
