// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task Graph (C4): a read-through cache over [`mc_storage::StateStore`]'s
//! task records, with dependency-cycle detection and ready/blocked views.

use std::collections::{BTreeSet, HashMap};

use mc_core::{Task, TaskError, TaskId, TaskStatus};
use mc_storage::StateStore;

use crate::error::EngineError;

pub struct TaskGraph<'a> {
    store: &'a StateStore,
}

impl<'a> TaskGraph<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    fn load(&self) -> Result<HashMap<TaskId, Task>, EngineError> {
        Ok(self.store.read_tasks()?.into_iter().map(|t| (t.id.clone(), t)).collect())
    }

    /// Create a task, deduping on content-derived identity. Rejects any
    /// dependency that doesn't exist, or that would introduce a cycle.
    pub fn create(
        &self,
        title: impl Into<String>,
        stage: mc_core::Stage,
        zone: impl Into<String>,
        persona: impl Into<String>,
        scope_paths: Vec<String>,
        deps: Vec<TaskId>,
        now: impl Into<String>,
    ) -> Result<TaskId, EngineError> {
        let title = title.into();
        let zone = zone.into();
        let persona = persona.into();
        let id = TaskId::derive(&title, stage, &zone, &persona);

        let existing = self.load()?;
        if existing.contains_key(&id) {
            return Ok(id);
        }
        for dep in &deps {
            if !existing.contains_key(dep) {
                return Err(TaskError::UnknownDependency(dep.to_string()).into());
            }
        }
        if let Some(cycle_dep) = deps.iter().find(|dep| self.introduces_cycle(&existing, &id, dep)) {
            return Err(TaskError::Cycle { task: id.to_string(), dep: cycle_dep.to_string() }.into());
        }

        let mut task = Task::new(title, stage, zone, persona, now)
            .with_dependencies(deps)
            .with_scope_paths(scope_paths);
        if task.dependencies.is_empty() {
            task.transition(TaskStatus::Ready, None, task.updated_at.clone())?;
        }
        self.store.append_task(&task)?;
        Ok(id)
    }

    /// DFS from `dep` following its own dependency edges; a cycle exists iff
    /// that walk reaches `new_id` (the task we're about to add `dep` to).
    fn introduces_cycle(&self, tasks: &HashMap<TaskId, Task>, new_id: &TaskId, dep: &TaskId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![dep.clone()];
        while let Some(current) = stack.pop() {
            if &current == new_id {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(task) = tasks.get(&current) {
                stack.extend(task.dependencies.iter().cloned());
            }
        }
        false
    }

    /// Add a dependency edge to an existing task, rejecting an unknown
    /// dependency or one that would introduce a cycle. Recomputes the
    /// ready-set afterward, since a freshly-added unmet dependency can only
    /// ever keep a task pending, never promote one.
    pub fn add_dependency(&self, id: &TaskId, dep: &TaskId, now: impl Into<String>) -> Result<Task, EngineError> {
        let mut tasks = self.load()?;
        if !tasks.contains_key(dep) {
            return Err(TaskError::UnknownDependency(dep.to_string()).into());
        }
        if id == dep || self.introduces_cycle(&tasks, id, dep) {
            return Err(TaskError::Cycle { task: id.to_string(), dep: dep.to_string() }.into());
        }
        let now = now.into();
        let task = tasks.get_mut(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.dependencies.insert(dep.clone());
        task.updated_at = now;
        let updated = task.clone();
        self.store.append_task(&updated)?;
        self.promote_ready(&mut tasks)?;
        Ok(updated)
    }

    /// Remove a dependency edge. May unblock the task, so the ready-set is
    /// recomputed afterward.
    pub fn remove_dependency(&self, id: &TaskId, dep: &TaskId, now: impl Into<String>) -> Result<Task, EngineError> {
        let mut tasks = self.load()?;
        let now = now.into();
        let task = tasks.get_mut(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.dependencies.remove(dep);
        task.updated_at = now;
        let updated = task.clone();
        self.store.append_task(&updated)?;
        self.promote_ready(&mut tasks)?;
        Ok(updated)
    }

    pub fn update_status(
        &self,
        id: &TaskId,
        new_status: TaskStatus,
        reason: Option<String>,
        now: impl Into<String>,
    ) -> Result<Task, EngineError> {
        let mut tasks = self.load()?;
        let task = tasks.get_mut(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.transition(new_status, reason, now.into())?;
        let updated = task.clone();
        self.store.append_task(&updated)?;
        self.promote_ready(&mut tasks)?;
        Ok(updated)
    }

    /// After any status change, any `pending` task whose dependencies are
    /// now all `done` is promoted to `ready`.
    fn promote_ready(&self, tasks: &mut HashMap<TaskId, Task>) -> Result<(), EngineError> {
        let done: BTreeSet<TaskId> = tasks.values().filter(|t| t.is_done()).map(|t| t.id.clone()).collect();
        let to_promote: BTreeSet<TaskId> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending && t.dependencies.iter().all(|d| done.contains(d)))
            .map(|t| t.id.clone())
            .collect();
        for task in tasks.values_mut().filter(|t| to_promote.contains(&t.id)) {
            task.transition(TaskStatus::Ready, None, task.updated_at.clone())?;
            self.store.append_task(task)?;
        }
        Ok(())
    }

    pub fn ready(&self) -> Result<Vec<Task>, EngineError> {
        let tasks = self.load()?;
        Ok(tasks.into_values().filter(|t| t.status == TaskStatus::Ready).collect())
    }

    pub fn blocked(&self) -> Result<Vec<Task>, EngineError> {
        let tasks = self.load()?;
        Ok(tasks.into_values().filter(|t| t.status == TaskStatus::Blocked).collect())
    }

    /// Flattened dependency closure of `id`, deepest-first.
    pub fn dep_tree(&self, id: &TaskId) -> Result<Vec<Task>, EngineError> {
        let tasks = self.load()?;
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(task) = tasks.get(&current) {
                stack.extend(task.dependencies.iter().cloned());
                out.push(task.clone());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::Stage;
    use tempfile::tempdir;

    #[test]
    fn creating_the_same_task_twice_dedups() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let a = graph.create("Build login form", Stage::Implement, "frontend", "developer", vec![], vec![], "t0").unwrap();
        let b = graph.create("Build login form", Stage::Implement, "frontend", "developer", vec![], vec![], "t0").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.read_tasks().unwrap().len(), 1);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let missing = TaskId::from("mc-0000000000");
        let err = graph
            .create("Ship it", Stage::Release, "all", "king", vec![], vec![missing], "t0")
            .unwrap_err();
        assert!(matches!(err, EngineError::Task(TaskError::UnknownDependency(_))));
    }

    #[test]
    fn dependency_promotes_to_ready_once_all_deps_done() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let dep = graph.create("Design schema", Stage::Design, "backend", "architect", vec![], vec![], "t0").unwrap();
        let dependent = graph
            .create("Write migration", Stage::Implement, "backend", "developer", vec![], vec![dep.clone()], "t0")
            .unwrap();

        graph.update_status(&dep, TaskStatus::InProgress, None, "t1").unwrap();
        graph.update_status(&dep, TaskStatus::Done, None, "t2").unwrap();

        let ready = graph.ready();
        let ready = ready.unwrap();
        assert!(ready.iter().any(|t| t.id == dependent));
    }

    #[test]
    fn adding_a_dependency_that_would_cycle_is_rejected() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let a = graph.create("Task A", Stage::Implement, "z", "developer", vec![], vec![], "t0").unwrap();
        let b = graph.create("Task B", Stage::Implement, "z", "developer", vec![], vec![a.clone()], "t0").unwrap();

        let err = graph.add_dependency(&a, &b, "t1").unwrap_err();
        assert!(matches!(err, EngineError::Task(TaskError::Cycle { .. })));
    }

    #[test]
    fn adding_a_dependency_is_reflected_on_the_task() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let dep = graph.create("Design schema", Stage::Design, "backend", "architect", vec![], vec![], "t0").unwrap();
        let dependent = graph.create("Write migration", Stage::Implement, "backend", "developer", vec![], vec![], "t0").unwrap();

        graph.add_dependency(&dependent, &dep, "t1").unwrap();
        let task = graph.load().unwrap().remove(&dependent).unwrap();
        assert!(task.dependencies.contains(&dep));
    }

    #[test]
    fn removing_a_dependency_promotes_the_task_to_ready() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let dep = graph.create("Design schema", Stage::Design, "backend", "architect", vec![], vec![], "t0").unwrap();
        let dependent = graph
            .create("Write migration", Stage::Implement, "backend", "developer", vec![], vec![dep.clone()], "t0")
            .unwrap();
        assert!(!graph.ready().unwrap().iter().any(|t| t.id == dependent));

        graph.remove_dependency(&dependent, &dep, "t1").unwrap();
        assert!(graph.ready().unwrap().iter().any(|t| t.id == dependent));
    }

    #[test]
    fn cyclic_dependency_is_rejected() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path());
        let graph = TaskGraph::new(&store);
        let a = graph.create("Task A", Stage::Implement, "z", "developer", vec![], vec![], "t0").unwrap();
        let b = graph.create("Task B", Stage::Implement, "z", "developer", vec![], vec![a.clone()], "t0").unwrap();

        // Attempting to make A depend on B (which already depends on A) is a cycle.
        // We simulate this by trying to create a task identical to A but with dep b,
        // which hashes to a different id, so instead we directly assert introduces_cycle.
        let graph_tasks = graph.load().unwrap();
        assert!(graph.introduces_cycle(&graph_tasks, &a, &b));
    }
}
