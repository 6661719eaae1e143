// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Watcher (C9): polls the State Store on a fixed interval, diffs
//! against an in-memory shadow of the last poll, and publishes the named
//! event set to the Event Hub. Grounded on the teacher's reconciliation-loop
//! poll pattern, simplified here since `mc-storage` has no change-notify hook
//! of its own.

use std::collections::HashMap;
use std::time::Duration;

use mc_core::{Event, Gate, GateStatus, Stage, Task, TaskId, WorkerId, WorkerRecord};
use mc_storage::StateStore;

use crate::hub::Hub;

#[derive(Debug, Default)]
struct Shadow {
    stage: Option<Stage>,
    tasks: HashMap<TaskId, Task>,
    gates: HashMap<Stage, Gate>,
    workers: HashMap<WorkerId, WorkerRecord>,
}

pub struct Watcher {
    store: std::sync::Arc<StateStore>,
    hub: std::sync::Arc<Hub>,
    poll_interval: Duration,
    shadow: Shadow,
}

impl Watcher {
    pub fn new(store: std::sync::Arc<StateStore>, hub: std::sync::Arc<Hub>, poll_interval_ms: u64) -> Self {
        Self { store, hub, poll_interval: Duration::from_millis(poll_interval_ms), shadow: Shadow::default() }
    }

    /// Run the poll loop until `shutdown` fires. Each tick is infallible from
    /// the caller's perspective: a read error is logged and the loop
    /// continues on the next interval rather than tearing down the daemon.
    pub async fn run(mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once() {
                        tracing::warn!(error = %e, "watcher poll failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    fn poll_once(&mut self) -> Result<(), mc_storage::StorageError> {
        self.diff_stage(self.store.read_stage()?);
        self.diff_tasks(self.store.read_tasks()?);
        self.diff_gates(self.store.read_gates()?.into_iter().collect());
        self.diff_workers(self.store.read_workers()?);
        Ok(())
    }

    fn diff_stage(&mut self, current: Stage) {
        if let Some(previous) = self.shadow.stage {
            if previous != current {
                self.hub.publish(Event::StageChanged { previous, current });
            }
        }
        self.shadow.stage = Some(current);
    }

    fn diff_tasks(&mut self, current: Vec<Task>) {
        let mut seen = HashMap::new();
        for task in current {
            match self.shadow.tasks.get(&task.id) {
                None => self.hub.publish(Event::TaskCreated { task: task.clone() }),
                Some(previous) if previous.status != task.status => {
                    self.hub.publish(Event::TaskUpdated {
                        task_id: task.id.clone(),
                        status: task.status,
                        previous: previous.status,
                    });
                }
                Some(_) => {}
            }
            seen.insert(task.id.clone(), task);
        }
        self.shadow.tasks = seen;
    }

    fn diff_gates(&mut self, current: HashMap<Stage, Gate>) {
        for (stage, gate) in &current {
            match self.shadow.gates.get(stage) {
                Some(previous) if previous.status != gate.status => {
                    self.hub.publish(Event::GateStatusChanged { stage: *stage, status: gate.status });
                    match gate.status {
                        GateStatus::AwaitingApproval => self.hub.publish(Event::GateReady { stage: *stage }),
                        GateStatus::Open => self.hub.publish(Event::GateApproved {
                            stage: *stage,
                            approved_at: gate.approved_at.clone().unwrap_or_default(),
                            approved_by: gate.approved_by.clone().unwrap_or_default(),
                        }),
                        GateStatus::Closed => {}
                    }
                }
                _ => {}
            }
        }
        self.shadow.gates = current;
    }

    fn diff_workers(&mut self, current: Vec<WorkerRecord>) {
        let mut seen = HashMap::new();
        for worker in current {
            match self.shadow.workers.get(&worker.id) {
                None => self.hub.publish(Event::WorkerSpawned {
                    worker_id: worker.id.clone(),
                    persona: worker.persona.clone(),
                    zone: worker.zone.clone(),
                    task_id: TaskId::from(worker.task_id.clone()),
                }),
                Some(previous) if previous.health != worker.health => {
                    self.hub.publish(Event::WorkerStatusChanged {
                        worker_id: worker.id.clone(),
                        health: worker.health.to_string(),
                    });
                }
                Some(_) => {}
            }
            seen.insert(worker.id.clone(), worker);
        }
        for (id, previous) in &self.shadow.workers {
            if !seen.contains_key(id) {
                self.hub.publish(Event::WorkerCompleted {
                    worker_id: id.clone(),
                    task_id: TaskId::from(previous.task_id.clone()),
                });
            }
        }
        self.shadow.workers = seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::TaskStatus;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn watcher(store: Arc<StateStore>, hub: Arc<Hub>) -> Watcher {
        Watcher::new(store, hub, 50)
    }

    #[test]
    fn first_poll_does_not_emit_stage_changed() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let mut rx = hub.subscribe("stage");
        let mut w = watcher(store, hub);
        w.poll_once().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stage_change_between_polls_emits_event() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let mut rx = hub.subscribe("stage");
        let mut w = watcher(store.clone(), hub);
        w.poll_once().unwrap();
        store.write_stage(Stage::Goal, "t1").unwrap();
        w.poll_once().unwrap();
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, Event::StageChanged { current: Stage::Goal, .. }));
    }

    #[test]
    fn new_task_on_second_poll_emits_task_created() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let mut rx = hub.subscribe("tasks");
        let mut w = watcher(store.clone(), hub);
        w.poll_once().unwrap();
        let task = Task::new("Build login form", Stage::Implement, "frontend", "developer", "t0");
        store.append_task(&task).unwrap();
        w.poll_once().unwrap();
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, Event::TaskCreated { .. }));
    }

    #[test]
    fn task_status_change_emits_task_updated() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let mut w = watcher(store.clone(), hub.clone());
        let mut task = Task::new("Build login form", Stage::Implement, "frontend", "developer", "t0");
        store.append_task(&task).unwrap();
        w.poll_once().unwrap();

        let mut rx = hub.subscribe("tasks");
        task.transition(TaskStatus::InProgress, None, "t1".into()).unwrap();
        store.append_task(&task).unwrap();
        w.poll_once().unwrap();
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, Event::TaskUpdated { status: TaskStatus::InProgress, .. }));
    }
}
