// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process spawning, abstracted behind a trait so the supervisor can be
//! tested without launching real child processes. Mirrors the shape of
//! `NotifyAdapter`/`DesktopNotifyAdapter` in the teacher's adapter crate: one
//! async trait, one real implementation, one fake gated behind `test-support`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum WorkerProcessError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("worker stdin is closed")]
    StdinClosed,
    #[error("worker process already exited")]
    AlreadyExited,
}

/// A worker process's stdout, delivered as individual lines. `child` is
/// `None` for fakes driven directly by a test-owned sender.
pub struct SpawnedWorker {
    pub lines: mpsc::Receiver<String>,
    child: Option<Child>,
}

impl SpawnedWorker {
    pub async fn send(&mut self, text: &str) -> Result<(), WorkerProcessError> {
        use tokio::io::AsyncWriteExt;
        let child = self.child.as_mut().ok_or(WorkerProcessError::StdinClosed)?;
        let stdin = child.stdin.as_mut().ok_or(WorkerProcessError::StdinClosed)?;
        stdin.write_all(text.as_bytes()).await.map_err(|_| WorkerProcessError::StdinClosed)?;
        stdin.write_all(b"\n").await.map_err(|_| WorkerProcessError::StdinClosed)?;
        Ok(())
    }

    pub async fn kill(&mut self) -> Result<(), WorkerProcessError> {
        match self.child.as_mut() {
            Some(child) => child.start_kill().map_err(WorkerProcessError::Spawn),
            None => Ok(()),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    pub async fn try_wait(&mut self) -> Result<Option<i32>, WorkerProcessError> {
        match self.child.as_mut() {
            Some(child) => Ok(child.try_wait()?.and_then(|status| status.code())),
            None => Ok(None),
        }
    }
}

#[async_trait]
pub trait WorkerProcessAdapter: Send + Sync + 'static {
    async fn spawn(
        &self,
        command: &str,
        args: &[String],
        cwd: &PathBuf,
        env: &HashMap<String, String>,
    ) -> Result<SpawnedWorker, WorkerProcessError>;
}

#[derive(Clone, Default)]
pub struct TokioProcessAdapter;

#[async_trait]
impl WorkerProcessAdapter for TokioProcessAdapter {
    async fn spawn(
        &self,
        command: &str,
        args: &[String],
        cwd: &PathBuf,
        env: &HashMap<String, String>,
    ) -> Result<SpawnedWorker, WorkerProcessError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().expect("stdout piped");
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        Ok(SpawnedWorker { lines: rx, child: Some(child) })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SpawnCall {
        pub command: String,
        pub args: Vec<String>,
        pub cwd: PathBuf,
    }

    #[derive(Default)]
    struct FakeState {
        calls: Vec<SpawnCall>,
        senders: Vec<mpsc::Sender<String>>,
    }

    /// Records spawn calls and hands back a channel the test can feed
    /// synthetic stdout lines into, without launching any real process.
    #[derive(Clone, Default)]
    pub struct FakeWorkerProcessAdapter {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeWorkerProcessAdapter {
        pub fn calls(&self) -> Vec<SpawnCall> {
            self.state.lock().calls.clone()
        }

        /// Push a line into the stdout of the nth (0-indexed) spawned worker.
        pub async fn push_line(&self, worker_index: usize, line: impl Into<String>) {
            let sender = self.state.lock().senders.get(worker_index).cloned();
            if let Some(sender) = sender {
                let _ = sender.send(line.into()).await;
            }
        }
    }

    #[async_trait]
    impl WorkerProcessAdapter for FakeWorkerProcessAdapter {
        async fn spawn(
            &self,
            command: &str,
            args: &[String],
            cwd: &PathBuf,
            _env: &HashMap<String, String>,
        ) -> Result<SpawnedWorker, WorkerProcessError> {
            let (tx, rx) = mpsc::channel(256);
            let mut state = self.state.lock();
            state.calls.push(SpawnCall {
                command: command.to_string(),
                args: args.to_vec(),
                cwd: cwd.clone(),
            });
            state.senders.push(tx);
            Ok(SpawnedWorker { lines: rx, child: None })
        }
    }
}
