//! Task ownership and mutation.
//!
//! `TaskStore` is the seam between the core and its backing state: the
//! in-memory backend lives here, the SQLite backend in `storage::task_db`.
//! Both funnel every mutation through the shared helpers below so the
//! validation and credit policy is applied identically.

mod memory;

pub use memory::MemoryStore;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::task::{NewTask, Priority, Task, TaskFilter, TaskPatch, TaskSummary};

/// Tunable rules every store backend applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePolicy {
    /// Lower bound for estimated units. 0 permits "no fixed estimate".
    pub min_estimate: u32,
    pub max_estimate: u32,
    /// Mark a task done once completed units reach its estimate.
    pub auto_done_on_estimate: bool,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            min_estimate: 1,
            max_estimate: 20,
            auto_done_on_estimate: true,
        }
    }
}

/// Owns the set of tasks. All operations are synchronous and atomic: a
/// rejected mutation leaves the store unchanged.
pub trait TaskStore {
    fn policy(&self) -> &StorePolicy;

    /// Validate and insert a new task. Returns the stored task.
    fn add(&mut self, new: NewTask) -> Result<Task>;

    fn get(&self, id: &str) -> Result<Option<Task>>;

    /// Partial update; absent patch fields stay unchanged.
    fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task>;

    fn delete(&mut self, id: &str) -> Result<()>;

    /// Record one completed work unit. Applies the auto-done policy.
    fn credit_unit(&mut self, id: &str) -> Result<Task>;

    /// Flip the done flag independent of unit counts.
    fn toggle_done(&mut self, id: &str) -> Result<Task>;

    /// Matching tasks in display order (see `task::sort_for_display`).
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Schedule every task of the given priority for today.
    /// Returns the number of tasks actually flipped.
    fn mark_today_by_priority(&mut self, priority: Priority) -> Result<usize>;

    /// Delete every done task. Returns the number removed.
    fn clear_done(&mut self) -> Result<usize>;

    /// Zero completed units and clear the done flag on every task.
    fn reset_all_progress(&mut self) -> Result<()>;

    fn summary(&self) -> Result<TaskSummary> {
        let tasks = self.list(&TaskFilter::default())?;
        let mut summary = TaskSummary {
            total: tasks.len() as u64,
            ..TaskSummary::default()
        };
        for task in &tasks {
            if task.done {
                summary.done += 1;
            } else if task.scheduled_today {
                summary.pending_today += 1;
            }
            summary.completed_units += u64::from(task.completed_units);
        }
        Ok(summary)
    }
}

/// Validate a `NewTask` against the policy and build the stored `Task`.
pub(crate) fn task_from_new(new: NewTask, policy: &StorePolicy) -> Result<Task> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle.into());
    }
    check_estimate(new.estimated_units, policy)?;
    Ok(Task {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        priority: new.priority,
        category: new.category,
        estimated_units: new.estimated_units,
        completed_units: 0,
        done: false,
        scheduled_today: new.scheduled_today,
        due_date: new.due_date,
        created_at: Utc::now(),
    })
}

/// Apply a patch to a task. Validates every incoming field before writing
/// any of them, so a rejected patch is not observable.
pub(crate) fn apply_patch(task: &mut Task, patch: TaskPatch, policy: &StorePolicy) -> Result<()> {
    let title = match &patch.title {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyTitle.into());
            }
            Some(trimmed.to_string())
        }
        None => None,
    };
    if let Some(estimate) = patch.estimated_units {
        check_estimate(estimate, policy)?;
    }

    if let Some(title) = title {
        task.title = title;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if let Some(estimate) = patch.estimated_units {
        task.estimated_units = estimate;
    }
    if let Some(done) = patch.done {
        task.done = done;
    }
    if let Some(today) = patch.scheduled_today {
        task.scheduled_today = today;
    }
    if let Some(due) = patch.due_date {
        task.due_date = due;
    }
    Ok(())
}

/// Record one completed unit. Estimate 0 means "no fixed estimate" and
/// never auto-completes.
pub(crate) fn apply_credit(task: &mut Task, policy: &StorePolicy) {
    task.completed_units = task.completed_units.saturating_add(1);
    if policy.auto_done_on_estimate
        && task.estimated_units > 0
        && task.completed_units >= task.estimated_units
    {
        task.done = true;
    }
}

fn check_estimate(estimate: u32, policy: &StorePolicy) -> Result<()> {
    if estimate < policy.min_estimate || estimate > policy.max_estimate {
        return Err(ValidationError::EstimateOutOfRange {
            min: policy.min_estimate,
            max: policy.max_estimate,
            got: estimate,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn new_task_title_is_trimmed() {
        let task = task_from_new(NewTask::new("  Write report  "), &StorePolicy::default()).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.completed_units, 0);
        assert!(!task.done);
    }

    #[test]
    fn new_task_rejects_blank_title() {
        let err = task_from_new(NewTask::new("   "), &StorePolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyTitle)
        ));
    }

    #[test]
    fn new_task_rejects_out_of_range_estimate() {
        let mut new = NewTask::new("a");
        new.estimated_units = 21;
        let err = task_from_new(new, &StorePolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EstimateOutOfRange { min: 1, max: 20, got: 21 })
        ));
    }

    #[test]
    fn rejected_patch_leaves_task_untouched() {
        let policy = StorePolicy::default();
        let mut task = task_from_new(NewTask::new("a"), &policy).unwrap();
        let before = task.clone();

        let patch = TaskPatch {
            priority: Some(Priority::High),
            estimated_units: Some(0), // below minimum, whole patch must fail
            ..Default::default()
        };
        assert!(apply_patch(&mut task, patch, &policy).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn credit_respects_auto_done_policy() {
        let auto = StorePolicy::default();
        let manual = StorePolicy {
            auto_done_on_estimate: false,
            ..StorePolicy::default()
        };

        let mut new = NewTask::new("a");
        new.estimated_units = 2;
        let mut task = task_from_new(new.clone(), &auto).unwrap();
        apply_credit(&mut task, &auto);
        assert!(!task.done);
        apply_credit(&mut task, &auto);
        assert!(task.done);
        assert_eq!(task.completed_units, 2);

        let mut task = task_from_new(new, &manual).unwrap();
        apply_credit(&mut task, &manual);
        apply_credit(&mut task, &manual);
        apply_credit(&mut task, &manual);
        assert!(!task.done);
        assert_eq!(task.completed_units, 3);
    }

    #[test]
    fn zero_estimate_never_auto_completes() {
        let policy = StorePolicy {
            min_estimate: 0,
            ..StorePolicy::default()
        };
        let mut new = NewTask::new("open ended");
        new.estimated_units = 0;
        let mut task = task_from_new(new, &policy).unwrap();
        for _ in 0..5 {
            apply_credit(&mut task, &policy);
        }
        assert_eq!(task.completed_units, 5);
        assert!(!task.done);
    }
}
