// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow Engine (C3): the stage/gate state machine. Process enforcement
//! ("verify needs reviewer+security+tester done tasks") lives here, not in
//! any client, so a tampered CLI can't approve its own gate.

use mc_core::{Gate, GateStatus, Stage};
use mc_storage::StateStore;

use crate::error::EngineError;

pub struct Workflow<'a> {
    store: &'a StateStore,
}

impl<'a> Workflow<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    pub fn current(&self) -> Result<Stage, EngineError> {
        Ok(self.store.read_stage()?)
    }

    pub fn check(&self, stage: Stage) -> Result<Gate, EngineError> {
        let mut gates = self.store.read_gates()?;
        Ok(gates.remove(&stage).unwrap_or_else(|| Gate::new(stage)))
    }

    /// Advance the cursor to `target`. Succeeds only if `target` is the
    /// stage immediately after the current one and that stage's gate is
    /// open.
    pub fn advance(&self, target: Stage, now: impl Into<String>) -> Result<(), EngineError> {
        let current = self.current()?;
        if Some(target) != current.next() {
            return Err(EngineError::IllegalStageTransition(current.as_str().to_string(), target.as_str().to_string()));
        }
        let gate = self.check(current)?;
        if !gate.is_open() {
            return Err(EngineError::GateNotOpen(current.as_str().to_string()));
        }
        self.store.write_stage(target, now)?;
        Ok(())
    }

    /// Satisfy a named criterion. Task-backed criteria (see
    /// [`TASK_BACKED_CRITERIA`]) are not settled by the client's say-so: the
    /// live task set is consulted and a false claim is rejected, so a
    /// tampered validator can't self-approve.
    pub fn satisfy(&self, stage: Stage, criterion: &str) -> Result<Gate, EngineError> {
        if let Some(persona) = task_backed_persona(stage, criterion) {
            let tasks = self.store.read_tasks()?;
            if !persona_task_done(&tasks, persona) {
                return Err(EngineError::CriterionNotMet { stage: stage.as_str().to_string(), criterion: criterion.to_string() });
            }
        }
        let mut gates = self.store.read_gates()?;
        let gate = gates.entry(stage).or_insert_with(|| Gate::new(stage));
        gate.satisfy(criterion)?;
        let updated = gate.clone();
        self.store.rewrite_gates(&gates)?;
        Ok(updated)
    }

    /// Re-evaluate every task-backed criterion against `tasks`, satisfying
    /// any gate criterion whose backing persona now has a done task. Called
    /// by the kernel after every task transition, so process enforcement
    /// happens whether or not a client ever calls `satisfy` for it.
    pub fn sync_task_backed_criteria(&self, tasks: &[mc_core::Task]) -> Result<(), EngineError> {
        let mut gates = self.store.read_gates()?;
        let mut changed = false;
        for (stage, criterion, persona) in TASK_BACKED_CRITERIA {
            if !persona_task_done(tasks, persona) {
                continue;
            }
            let gate = gates.entry(*stage).or_insert_with(|| Gate::new(*stage));
            if gate.criteria.iter().any(|c| c.description == *criterion && !c.satisfied) {
                gate.satisfy(criterion)?;
                changed = true;
            }
        }
        if changed {
            self.store.rewrite_gates(&gates)?;
        }
        Ok(())
    }

    /// Approve the gate for `stage`. On success, an auto-checkpoint should
    /// be taken by the caller (the kernel facade owns sequencing that with
    /// the checkpoint writer).
    pub fn approve(&self, stage: Stage, actor: impl Into<String>, now: impl Into<String>) -> Result<Gate, EngineError> {
        let mut gates = self.store.read_gates()?;
        let gate = gates.entry(stage).or_insert_with(|| Gate::new(stage));
        gate.approve(actor, now)?;
        let updated = gate.clone();
        self.store.rewrite_gates(&gates)?;
        Ok(updated)
    }

    /// A rejection leaves gate status unchanged; only the audit trail
    /// records it (the caller appends the audit entry with `reason`).
    pub fn reject(&self, stage: Stage) -> Result<Gate, EngineError> {
        self.check(stage)
    }
}

/// Criteria whose truth the engine derives from the live task set rather
/// than a client's claim: `(stage, criterion text, required persona)`.
const TASK_BACKED_CRITERIA: &[(Stage, &str, &str)] = &[
    (Stage::Implement, "integrator task done", "integrator"),
    (Stage::Verify, "reviewer task done", "reviewer"),
    (Stage::Verify, "security task done", "security"),
    (Stage::Verify, "tester task done", "tester"),
];

fn task_backed_persona(stage: Stage, criterion: &str) -> Option<&'static str> {
    TASK_BACKED_CRITERIA.iter().find(|(s, c, _)| *s == stage && *c == criterion).map(|(_, _, persona)| *persona)
}

fn persona_task_done(tasks: &[mc_core::Task], persona: &str) -> bool {
    tasks.iter().any(|t| t.persona == persona && t.is_done())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::TaskStatus;
    use tempfile::tempdir;

    #[test]
    fn advance_rejects_non_successor_target() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let workflow = Workflow::new(&store);
        let err = workflow.advance(Stage::Verify, "now").unwrap_err();
        assert!(matches!(err, EngineError::IllegalStageTransition(_, _)));
    }

    #[test]
    fn advance_rejects_closed_gate() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let workflow = Workflow::new(&store);
        let err = workflow.advance(Stage::Goal, "now").unwrap_err();
        assert!(matches!(err, EngineError::GateNotOpen(_)));
    }

    #[test]
    fn satisfy_all_criteria_then_approve_opens_gate_and_advance_succeeds() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let workflow = Workflow::new(&store);
        for criterion in Stage::Discovery.default_criteria() {
            workflow.satisfy(Stage::Discovery, criterion).unwrap();
        }
        let gate = workflow.check(Stage::Discovery).unwrap();
        assert_eq!(gate.status, GateStatus::AwaitingApproval);

        workflow.approve(Stage::Discovery, "operator", "now").unwrap();
        workflow.advance(Stage::Goal, "now").unwrap();
        assert_eq!(workflow.current().unwrap(), Stage::Goal);
    }

    #[test]
    fn satisfy_rejects_a_task_backed_criterion_with_no_matching_done_task() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let workflow = Workflow::new(&store);
        let err = workflow.satisfy(Stage::Verify, "reviewer task done").unwrap_err();
        assert!(matches!(err, EngineError::CriterionNotMet { .. }));
    }

    #[test]
    fn satisfy_accepts_a_task_backed_criterion_once_the_persona_task_is_done() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let workflow = Workflow::new(&store);
        let mut reviewer = mc_core::Task::new("r", Stage::Verify, "z", "reviewer", "t0");
        reviewer.transition(TaskStatus::InProgress, None, "t1".into()).unwrap();
        reviewer.transition(TaskStatus::Done, None, "t2".into()).unwrap();
        store.append_task(&reviewer).unwrap();

        workflow.satisfy(Stage::Verify, "reviewer task done").unwrap();
    }

    #[test]
    fn sync_task_backed_criteria_satisfies_verify_once_all_three_personas_are_done() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let workflow = Workflow::new(&store);
        let mut tasks = vec![
            mc_core::Task::new("r", Stage::Verify, "z", "reviewer", "t0"),
            mc_core::Task::new("s", Stage::Verify, "z", "security", "t0"),
        ];
        workflow.sync_task_backed_criteria(&tasks).unwrap();
        let gate = workflow.check(Stage::Verify).unwrap();
        assert!(!gate.all_satisfied());

        tasks.push(mc_core::Task::new("t", Stage::Verify, "z", "tester", "t0"));
        for task in &mut tasks {
            task.transition(TaskStatus::InProgress, None, "t1".into()).unwrap();
            task.transition(TaskStatus::Done, None, "t2".into()).unwrap();
        }
        workflow.sync_task_backed_criteria(&tasks).unwrap();
        let gate = workflow.check(Stage::Verify).unwrap();
        assert!(gate.all_satisfied());
    }
}
