use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::IntervalKind;

/// Every observable state change in the cycle timer produces an Event.
/// The presentation layer prints them; hosts may subscribe to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        kind: IntervalKind,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Paused; remaining time frozen at the value computed from the
    /// end instant.
    TimerStopped {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        kind: IntervalKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ModeChanged {
        from: IntervalKind,
        to: IntervalKind,
        at: DateTime<Utc>,
    },
    TaskSelected {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// An interval ran down to zero and the rotation advanced.
    /// `credited_task` is set when a focus completion credited a task.
    CycleCompleted {
        finished: IntervalKind,
        next: IntervalKind,
        focus_cycles: u32,
        credited_task: Option<String>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        kind: IntervalKind,
        running: bool,
        remaining_secs: u64,
        duration_secs: u64,
        progress: f64,
        focus_cycles: u32,
        selected_task: Option<String>,
        at: DateTime<Utc>,
    },
}
