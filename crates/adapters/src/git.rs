// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional auto-commit of state-file mutations, grounded on the same
//! adapter-plus-fake shape as [`crate::process`]. `git2` is adopted here
//! since the teacher carries no git integration of its own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitCommitError {
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
    #[error("no repository at {0}")]
    NoRepository(PathBuf),
}

#[async_trait]
pub trait GitCommitAdapter: Send + Sync + 'static {
    /// Stage `paths` (relative to the repository root) and commit with
    /// message `[mc:<category>] <summary>`. Returns the new commit's hex id.
    async fn commit(&self, paths: &[PathBuf], category: &str, summary: &str) -> Result<String, GitCommitError>;
}

pub struct Git2CommitAdapter {
    repo_root: PathBuf,
}

impl Git2CommitAdapter {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { repo_root: repo_root.into() }
    }

    fn commit_blocking(repo_root: &Path, paths: &[PathBuf], category: &str, summary: &str) -> Result<String, GitCommitError> {
        let repo = git2::Repository::open(repo_root).map_err(|_| GitCommitError::NoRepository(repo_root.to_path_buf()))?;
        let mut index = repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let signature = repo.signature().or_else(|_| git2::Signature::now("mcd", "mcd@localhost"))?;
        let message = format!("[mc:{category}] {summary}");

        let parent = repo.head().ok().and_then(|h| h.target()).and_then(|oid| repo.find_commit(oid).ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let commit_id = repo.commit(Some("HEAD"), &signature, &signature, &message, &tree, &parents)?;
        Ok(commit_id.to_string())
    }
}

#[async_trait]
impl GitCommitAdapter for Git2CommitAdapter {
    async fn commit(&self, paths: &[PathBuf], category: &str, summary: &str) -> Result<String, GitCommitError> {
        let repo_root = self.repo_root.clone();
        let paths = paths.to_vec();
        let category = category.to_string();
        let summary = summary.to_string();
        tokio::task::spawn_blocking(move || Self::commit_blocking(&repo_root, &paths, &category, &summary))
            .await
            .map_err(|_| GitCommitError::NoRepository(repo_root_unreachable()))?
    }
}

fn repo_root_unreachable() -> PathBuf {
    PathBuf::from("<blocking task panicked>")
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct CommitCall {
        pub paths: Vec<PathBuf>,
        pub category: String,
        pub summary: String,
    }

    #[derive(Clone, Default)]
    pub struct FakeGitCommitAdapter {
        calls: Arc<Mutex<Vec<CommitCall>>>,
    }

    impl FakeGitCommitAdapter {
        pub fn calls(&self) -> Vec<CommitCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl GitCommitAdapter for FakeGitCommitAdapter {
        async fn commit(&self, paths: &[PathBuf], category: &str, summary: &str) -> Result<String, GitCommitError> {
            self.calls.lock().push(CommitCall { paths: paths.to_vec(), category: category.to_string(), summary: summary.to_string() });
            Ok(format!("fake-commit-{}", self.calls.lock().len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeGitCommitAdapter;
    use super::*;

    #[tokio::test]
    async fn fake_records_category_prefixed_commits() {
        let adapter = FakeGitCommitAdapter::default();
        let id = adapter.commit(&[PathBuf::from(".mission/state/tasks.jsonl")], "task", "create mc-abc").await.unwrap();
        assert_eq!(id, "fake-commit-1");
        assert_eq!(adapter.calls()[0].category, "task");
    }
}
