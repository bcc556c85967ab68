//! Task model: the unit of work tracked by the store and credited by the
//! cycle timer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task priority. Declaration order is the sort order: `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// A tracked task.
///
/// Owned exclusively by a `TaskStore`; everything else holds only the id.
/// `completed_units` moves through `credit_unit` (and `reset_all_progress`),
/// never through a partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub category: String,
    pub estimated_units: u32,
    pub completed_units: u32,
    pub done: bool,
    pub scheduled_today: bool,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Input for `TaskStore::add`. The store validates and assigns identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_estimate")]
    pub estimated_units: u32,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_today: bool,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_estimate() -> u32 {
    1
}

impl NewTask {
    /// New task input with default priority, category and estimate.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            priority: Priority::default(),
            category: default_category(),
            estimated_units: default_estimate(),
            due_date: None,
            scheduled_today: false,
        }
    }
}

/// Partial update for `TaskStore::update`. Absent fields stay unchanged.
///
/// `due_date` is doubly optional so an update can clear it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub estimated_units: Option<u32>,
    pub done: Option<bool>,
    pub scheduled_today: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Query filter for `TaskStore::list`. Default matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Exact category match.
    pub category: Option<String>,
    pub priority: Option<Priority>,
    /// Only tasks scheduled for today.
    pub scheduled_today: bool,
    /// `Some(true)` = only done, `Some(false)` = only pending.
    pub done: Option<bool>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(ref category) = self.category {
            if &task.category != category {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if self.scheduled_today && !task.scheduled_today {
            return false;
        }
        if let Some(done) = self.done {
            if task.done != done {
                return false;
            }
        }
        true
    }
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total: u64,
    pub done: u64,
    pub pending_today: u64,
    pub completed_units: u64,
}

/// Display ordering contract: today's tasks first, then priority (High
/// first), then pending before done. The sort is stable, so ties keep
/// insertion order. Computed at query time, never stored.
pub(crate) fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| (!t.scheduled_today, t.priority, t.done));
}
