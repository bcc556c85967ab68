//! In-memory task store. Insertion order is the Vec order, which is what
//! the display sort uses to break ties.

use crate::error::{CoreError, Result};
use crate::task::{sort_for_display, NewTask, Priority, Task, TaskFilter, TaskPatch};

use super::{apply_credit, apply_patch, task_from_new, StorePolicy, TaskStore};

/// Vec-backed store for a single session, and the reference behavior the
/// SQLite backend is tested against.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tasks: Vec<Task>,
    policy: StorePolicy,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: StorePolicy) -> Self {
        Self {
            tasks: Vec::new(),
            policy,
        }
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }
}

impl TaskStore for MemoryStore {
    fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    fn add(&mut self, new: NewTask) -> Result<Task> {
        let task = task_from_new(new, &self.policy)?;
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let idx = self.position(id)?;
        apply_patch(&mut self.tasks[idx], patch, &self.policy)?;
        Ok(self.tasks[idx].clone())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let idx = self.position(id)?;
        self.tasks.remove(idx);
        Ok(())
    }

    fn credit_unit(&mut self, id: &str) -> Result<Task> {
        let idx = self.position(id)?;
        apply_credit(&mut self.tasks[idx], &self.policy);
        Ok(self.tasks[idx].clone())
    }

    fn toggle_done(&mut self, id: &str) -> Result<Task> {
        let idx = self.position(id)?;
        self.tasks[idx].done = !self.tasks[idx].done;
        Ok(self.tasks[idx].clone())
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_for_display(&mut tasks);
        Ok(tasks)
    }

    fn mark_today_by_priority(&mut self, priority: Priority) -> Result<usize> {
        let mut flipped = 0;
        for task in &mut self.tasks {
            if task.priority == priority && !task.scheduled_today {
                task.scheduled_today = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    fn clear_done(&mut self) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.done);
        Ok(before - self.tasks.len())
    }

    fn reset_all_progress(&mut self) -> Result<()> {
        for task in &mut self.tasks {
            task.completed_units = 0;
            task.done = false;
        }
        Ok(())
    }
}
