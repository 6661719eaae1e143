// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Supervisor (C8): owns the live worker registry, spawns worker
//! processes through [`mc_adapters::process::WorkerProcessAdapter`], parses
//! their stdout for structured handoff/lifecycle lines, and periodically
//! reclassifies health from [`mc_core::WorkerHealth::classify`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use mc_adapters::process::{WorkerProcessAdapter, WorkerProcessError};
use mc_core::{Event, TaskId, WorkerHealth, WorkerId, WorkerRecord};
use mc_storage::StateStore;
use parking_lot::Mutex;
use serde_json::Value;

use crate::hub::Hub;

struct LiveWorker {
    task_id: TaskId,
    last_activity: Instant,
    stdin: mc_adapters::process::SpawnedWorker,
}

pub struct Supervisor<P: WorkerProcessAdapter> {
    store: Arc<StateStore>,
    hub: Arc<Hub>,
    adapter: Arc<P>,
    live: Mutex<HashMap<WorkerId, LiveWorker>>,
    idle_threshold_secs: u64,
    stuck_threshold_secs: u64,
}

impl<P: WorkerProcessAdapter> Supervisor<P> {
    pub fn new(store: Arc<StateStore>, hub: Arc<Hub>, adapter: Arc<P>, idle_threshold_secs: u64, stuck_threshold_secs: u64) -> Self {
        Self { store, hub, adapter, live: Mutex::new(HashMap::new()), idle_threshold_secs, stuck_threshold_secs }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn spawn(
        &self,
        command: &str,
        args: &[String],
        cwd: &PathBuf,
        env: &HashMap<String, String>,
        task_id: TaskId,
        zone: impl Into<String>,
        persona: impl Into<String>,
        now: impl Into<String>,
    ) -> Result<WorkerId, WorkerProcessError> {
        let worker_id = WorkerId::new();
        let now = now.into();
        let mut spawned = self.adapter.spawn(command, args, cwd, env).await?;
        let pid = spawned.pid();

        let record = WorkerRecord {
            id: worker_id,
            persona: persona.into(),
            zone: zone.into(),
            task_id: task_id.to_string(),
            pid,
            started_at: now.clone(),
            last_activity_at: now,
            health: WorkerHealth::Healthy,
        };
        self.push_record(record)?;

        let lines = std::mem::replace(&mut spawned.lines, tokio::sync::mpsc::channel(1).1);
        self.live.lock().insert(worker_id, LiveWorker { task_id: task_id.clone(), last_activity: Instant::now(), stdin: spawned });
        self.spawn_line_reader(worker_id, task_id, lines);

        Ok(worker_id)
    }

    fn spawn_line_reader(&self, worker_id: WorkerId, task_id: TaskId, mut lines: tokio::sync::mpsc::Receiver<String>) {
        let hub = self.hub.clone();
        tokio::spawn(async move {
            while let Some(line) = lines.recv().await {
                dispatch_stdout_line(&hub, worker_id, &task_id, &line);
            }
        });
    }

    /// Record stdin write activity / liveness as of `now`, so the next health
    /// reclassification doesn't see a false idle/stuck reading.
    pub fn touch(&self, worker_id: WorkerId) {
        if let Some(worker) = self.live.lock().get_mut(&worker_id) {
            worker.last_activity = Instant::now();
        }
    }

    pub async fn kill(&self, worker_id: WorkerId) -> Result<(), WorkerProcessError> {
        if let Some(mut worker) = self.live.lock().remove(&worker_id) {
            worker.stdin.kill().await?;
        }
        self.remove_record(worker_id)?;
        self.hub.publish(Event::WorkerCompleted { worker_id, task_id: TaskId::from("") });
        Ok(())
    }

    /// Reclassify every live worker's health against elapsed idle time and
    /// rewrite the registry if anything changed.
    pub async fn reclassify_health(&self) -> Result<(), mc_storage::StorageError> {
        let mut records = self.store.read_workers()?;
        let mut changed = false;
        for record in &mut records {
            let Some(worker) = self.live.lock().get(&record.id).map(|w| w.last_activity) else {
                continue;
            };
            let secs_since_activity = worker.elapsed().as_secs();
            let mut alive = true;
            let stdin_write_failed = false;
            if let Some(w) = self.live.lock().get_mut(&record.id) {
                alive = matches!(w.stdin.try_wait().await, Ok(None));
            }
            let health = WorkerHealth::classify(secs_since_activity, alive, stdin_write_failed, self.idle_threshold_secs, self.stuck_threshold_secs);
            if health != record.health {
                record.health = health;
                changed = true;
            }
        }
        if changed {
            self.store.rewrite_workers(&records)?;
        }
        Ok(())
    }

    fn push_record(&self, record: WorkerRecord) -> Result<(), mc_storage::StorageError> {
        let mut records = self.store.read_workers()?;
        records.push(record);
        self.store.rewrite_workers(&records)
    }

    fn remove_record(&self, worker_id: WorkerId) -> Result<(), mc_storage::StorageError> {
        let mut records = self.store.read_workers()?;
        records.retain(|r| r.id != worker_id);
        self.store.rewrite_workers(&records)
    }
}

/// Parse one stdout line for the lifecycle/tool-call/handoff markers a
/// worker process emits, publishing the matching event. Lines that aren't
/// recognized structured JSON are ignored — free-form chatter is normal.
fn dispatch_stdout_line(hub: &Hub, worker_id: WorkerId, task_id: &TaskId, line: &str) {
    let Ok(value) = serde_json::from_str::<Value>(line) else { return };
    let Some(kind) = value.get("type").and_then(Value::as_str) else { return };
    match kind {
        "handoff" => hub.publish(Event::HandoffCreated { task_id: task_id.clone(), worker_id }),
        "findings_ready" => hub.publish(Event::FindingsReady { task_id: task_id.clone() }),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_adapters::process::fake::FakeWorkerProcessAdapter;
    use tempfile::tempdir;

    #[tokio::test]
    async fn spawning_a_worker_registers_it_in_the_store() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let adapter = Arc::new(FakeWorkerProcessAdapter::default());
        let supervisor = Supervisor::new(store.clone(), hub, adapter, 30, 60);

        let task_id = TaskId::from("mc-abcdef0123");
        supervisor
            .spawn("king", &[], &PathBuf::from("/tmp"), &HashMap::new(), task_id, "frontend", "developer", "t0")
            .await
            .unwrap();

        let records = store.read_workers().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].health, WorkerHealth::Healthy);
    }

    #[tokio::test]
    async fn killing_a_worker_removes_it_from_the_registry() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let adapter = Arc::new(FakeWorkerProcessAdapter::default());
        let supervisor = Supervisor::new(store.clone(), hub, adapter, 30, 60);

        let worker_id = supervisor
            .spawn("king", &[], &PathBuf::from("/tmp"), &HashMap::new(), TaskId::from("mc-abcdef0123"), "frontend", "developer", "t0")
            .await
            .unwrap();
        supervisor.kill(worker_id).await.unwrap();
        assert!(store.read_workers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handoff_line_on_stdout_publishes_handoff_created() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        let hub = Arc::new(Hub::new());
        let mut rx = hub.subscribe("findings");
        let adapter = Arc::new(FakeWorkerProcessAdapter::default());
        let supervisor = Supervisor::new(store, hub, adapter.clone(), 30, 60);

        supervisor
            .spawn("king", &[], &PathBuf::from("/tmp"), &HashMap::new(), TaskId::from("mc-abcdef0123"), "frontend", "developer", "t0")
            .await
            .unwrap();
        adapter.push_line(0, r#"{"type":"handoff"}"#).await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::HandoffCreated { .. }));
    }
}
