//! Session context: one task store plus one cycle timer, wired together.
//!
//! The host owns session lifecycle and isolation; each session gets its own
//! instance and all access to it must be serialized. `tick` is the explicit
//! entry point a scheduled loop calls at >= 1 Hz while the timer runs: it
//! detects the zero-crossing and routes the focus-completion credit into
//! the store.

use crate::error::Result;
use crate::events::Event;
use crate::store::TaskStore;
use crate::timer::{CycleSettings, CycleTimer};

/// Owns the two core components and the credit wiring between them.
/// The timer holds only a task id; the lookup happens here, at credit time.
#[derive(Debug)]
pub struct Session<S: TaskStore> {
    store: S,
    timer: CycleTimer,
}

impl<S: TaskStore> Session<S> {
    pub fn new(store: S, settings: CycleSettings) -> Self {
        Self {
            store,
            timer: CycleTimer::new(settings),
        }
    }

    /// Rebuild a session from an existing store and timer (e.g. a timer
    /// deserialized by the host between invocations).
    pub fn from_parts(store: S, timer: CycleTimer) -> Self {
        Self { store, timer }
    }

    pub fn into_parts(self) -> (S, CycleTimer) {
        (self.store, self.timer)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn timer(&self) -> &CycleTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut CycleTimer {
        &mut self.timer
    }

    /// One scheduler beat: completes the cycle if the countdown has hit
    /// zero while running, crediting the selected task. Returns the
    /// completion event when a transition happened.
    pub fn tick(&mut self) -> Result<Option<Event>> {
        let store = &mut self.store;
        self.timer
            .complete_cycle(|id| store.credit_unit(id).map(|_| ()))
    }

    /// `tick` against an explicit clock, for simulated-time hosts.
    pub fn tick_at(&mut self, now_ms: u64) -> Result<Option<Event>> {
        let store = &mut self.store;
        self.timer
            .complete_cycle_at(now_ms, |id| store.credit_unit(id).map(|_| ()))
    }
}
