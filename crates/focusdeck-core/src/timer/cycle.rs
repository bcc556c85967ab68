//! Cycle timer implementation.
//!
//! The timer is a wall-clock-based state machine with no internal thread.
//! The caller polls it (>= 1 Hz while running) and invokes
//! `complete_cycle` when `poll` reaches zero.
//!
//! ## State Transitions
//!
//! ```text
//! Idle(kind) -> start -> Running(kind) -> stop/reset -> Idle(kind)
//!                        Running(kind) -> complete_cycle -> Idle(next kind)
//! ```
//!
//! While running, the canonical state is the absolute end instant
//! (epoch ms); remaining time is derived as `end - now`, so missed or
//! duplicated polls cannot drift. While idle, the frozen `remaining_ms` is
//! canonical. Every time-dependent method has an `_at(now_ms)` variant
//! taking an explicit instant; the plain form reads the wall clock.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::settings::{CycleSettings, IntervalKind};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;

/// Single-session countdown over the focus/break rotation.
///
/// Holds an optional weak reference (an id, resolved at credit time) to the
/// task credited when a focus interval completes. Never auto-starts the
/// next interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleTimer {
    settings: CycleSettings,
    kind: IntervalKind,
    running: bool,
    /// End instant (ms since epoch). Canonical while running, `None` idle.
    #[serde(default)]
    end_at_ms: Option<u64>,
    /// Frozen remaining time in milliseconds. Canonical while idle.
    remaining_ms: u64,
    /// Completed focus intervals. Only ever grows within a session.
    focus_cycles: u32,
    #[serde(default)]
    selected_task: Option<String>,
}

impl CycleTimer {
    /// Idle at a full focus interval. `settings` are assumed validated;
    /// `Config::cycle_settings` falls back to defaults otherwise.
    pub fn new(settings: CycleSettings) -> Self {
        let remaining_ms = settings.duration_ms(IntervalKind::Focus);
        Self {
            settings,
            kind: IntervalKind::Focus,
            running: false,
            end_at_ms: None,
            remaining_ms,
            focus_cycles: 0,
            selected_task: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn kind(&self) -> IntervalKind {
        self.kind
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn focus_cycles(&self) -> u32 {
        self.focus_cycles
    }

    pub fn selected_task(&self) -> Option<&str> {
        self.selected_task.as_deref()
    }

    /// Configured duration of the current interval, in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.settings.duration_secs(self.kind)
    }

    pub fn remaining_ms_at(&self, now_ms: u64) -> u64 {
        match (self.running, self.end_at_ms) {
            (true, Some(end)) => end.saturating_sub(now_ms),
            _ => self.remaining_ms,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms_at(now_ms())
    }

    /// Pure read of the countdown in whole seconds, rounded up so a
    /// sub-second tail still displays as one second. Zero while running is
    /// the signal to call `complete_cycle`.
    pub fn poll_at(&self, now_ms: u64) -> u64 {
        let ms = self.remaining_ms_at(now_ms);
        ms.div_ceil(1000)
    }

    pub fn poll(&self) -> u64 {
        self.poll_at(now_ms())
    }

    /// 0.0 .. 1.0 progress within the current interval.
    pub fn progress_at(&self, now_ms: u64) -> f64 {
        let total = self.settings.duration_ms(self.kind);
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_ms_at(now_ms) as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let now = now_ms();
        Event::StateSnapshot {
            kind: self.kind,
            running: self.running,
            remaining_secs: self.poll_at(now),
            duration_secs: self.duration_secs(),
            progress: self.progress_at(now),
            focus_cycles: self.focus_cycles,
            selected_task: self.selected_task.clone(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set or clear the task credited on the next focus completion.
    /// Always allowed; the id is resolved against the store only at credit
    /// time, so a later deletion cannot dangle.
    pub fn select_task(&mut self, task_id: Option<String>) -> Event {
        self.selected_task = task_id;
        Event::TaskSelected {
            task_id: self.selected_task.clone(),
            at: Utc::now(),
        }
    }

    /// Switch the interval kind. Uniform policy: forces the timer idle and
    /// resets remaining to the new kind's full duration, whether or not it
    /// was running.
    pub fn set_mode(&mut self, kind: IntervalKind) -> Event {
        let from = self.kind;
        self.kind = kind;
        self.running = false;
        self.end_at_ms = None;
        self.remaining_ms = self.settings.duration_ms(kind);
        Event::ModeChanged {
            from,
            to: kind,
            at: Utc::now(),
        }
    }

    /// Change one interval's duration. Rejected while that kind is
    /// actively running; reconfiguring the current kind while idle resets
    /// remaining to the new full duration. Idempotent.
    pub fn configure(&mut self, kind: IntervalKind, duration_secs: u64) -> Result<()> {
        if self.running && kind == self.kind {
            return Err(ValidationError::InvalidValue {
                field: "duration_secs".to_string(),
                message: format!("cannot reconfigure {} while it is running", kind),
            }
            .into());
        }
        self.settings.set_duration_secs(kind, duration_secs)?;
        if kind == self.kind {
            self.remaining_ms = self.settings.duration_ms(kind);
        }
        Ok(())
    }

    /// Toggle the policy requiring a selected task to start a focus
    /// interval. Always allowed; applies from the next `start`.
    pub fn set_require_task_for_focus(&mut self, require: bool) {
        self.settings.require_task_for_focus = require;
    }

    /// Change the long-break rotation modulus. Takes effect on the next
    /// focus completion.
    pub fn set_long_break_every(&mut self, every: u32) -> Result<()> {
        if every == 0 {
            return Err(ValidationError::InvalidValue {
                field: "long_break_every".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        self.settings.long_break_every = every;
        Ok(())
    }

    pub fn start(&mut self) -> Result<Option<Event>> {
        self.start_at(now_ms())
    }

    /// Start or resume the countdown: end instant = now + frozen remaining.
    /// No-op while already running, so elapsed time cannot double-apply.
    /// Starting a focus interval with no selected task is rejected when the
    /// require-task policy is on.
    pub fn start_at(&mut self, now_ms: u64) -> Result<Option<Event>> {
        if self.running {
            return Ok(None);
        }
        if self.kind.is_focus()
            && self.settings.require_task_for_focus
            && self.selected_task.is_none()
        {
            return Err(CoreError::NoTaskSelected);
        }
        self.end_at_ms = Some(now_ms.saturating_add(self.remaining_ms));
        self.running = true;
        Ok(Some(Event::TimerStarted {
            kind: self.kind,
            remaining_secs: self.poll_at(now_ms),
            at: Utc::now(),
        }))
    }

    pub fn stop(&mut self) -> Option<Event> {
        self.stop_at(now_ms())
    }

    /// Pause: freeze remaining at `end - now`. No-op while idle.
    pub fn stop_at(&mut self, now_ms: u64) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.remaining_ms = self.remaining_ms_at(now_ms);
        self.running = false;
        self.end_at_ms = None;
        Some(Event::TimerStopped {
            remaining_secs: self.remaining_ms.div_ceil(1000),
            at: Utc::now(),
        })
    }

    /// Back to a full idle interval of the current kind. The focus counter
    /// is untouched.
    pub fn reset(&mut self) -> Event {
        self.running = false;
        self.end_at_ms = None;
        self.remaining_ms = self.settings.duration_ms(self.kind);
        Event::TimerReset {
            kind: self.kind,
            duration_secs: self.duration_secs(),
            at: Utc::now(),
        }
    }

    pub fn complete_cycle<F>(&mut self, credit: F) -> Result<Option<Event>>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        self.complete_cycle_at(now_ms(), credit)
    }

    /// Advance the rotation once the countdown has hit zero while running;
    /// returns `Ok(None)` otherwise. Effects, in order: stop; on a focus
    /// completion bump the counter and credit the selected task through
    /// `credit` (a missing task is a no-op and drops the stale selection);
    /// move to the next kind (every `long_break_every`th focus completion
    /// earns the long break, breaks always return to focus) and reset
    /// remaining to its full duration. The next interval is never started
    /// here. A credit failure other than NotFound is surfaced only after
    /// the transition has fully completed.
    pub fn complete_cycle_at<F>(&mut self, now_ms: u64, credit: F) -> Result<Option<Event>>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        if !self.running || self.remaining_ms_at(now_ms) > 0 {
            return Ok(None);
        }

        self.running = false;
        self.end_at_ms = None;

        let finished = self.kind;
        let mut credited_task = None;
        let mut credit_failure = None;

        if finished.is_focus() {
            self.focus_cycles = self.focus_cycles.saturating_add(1);
            if let Some(id) = self.selected_task.clone() {
                match credit(&id) {
                    Ok(()) => credited_task = Some(id),
                    Err(CoreError::NotFound { .. }) => {
                        // Weak reference: the task is gone, forget it.
                        self.selected_task = None;
                    }
                    Err(other) => credit_failure = Some(other),
                }
            }
            self.kind = if self.focus_cycles % self.settings.long_break_every == 0 {
                IntervalKind::LongBreak
            } else {
                IntervalKind::ShortBreak
            };
        } else {
            self.kind = IntervalKind::Focus;
        }
        self.remaining_ms = self.settings.duration_ms(self.kind);

        if let Some(err) = credit_failure {
            return Err(err);
        }
        Ok(Some(Event::CycleCompleted {
            finished,
            next: self.kind,
            focus_cycles: self.focus_cycles,
            credited_task,
            at: Utc::now(),
        }))
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_000_000;

    fn focus_timer() -> CycleTimer {
        let mut timer = CycleTimer::new(CycleSettings::default());
        timer.select_task(Some("task-1".to_string()));
        timer
    }

    fn no_credit(_: &str) -> Result<()> {
        Ok(())
    }

    #[test]
    fn starts_idle_at_full_focus_duration() {
        let timer = CycleTimer::new(CycleSettings::default());
        assert_eq!(timer.kind(), IntervalKind::Focus);
        assert!(!timer.running());
        assert_eq!(timer.poll_at(T0), 1500);
        assert_eq!(timer.focus_cycles(), 0);
    }

    #[test]
    fn poll_tracks_wall_clock_while_running() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();
        assert_eq!(timer.poll_at(T0), 1500);
        assert_eq!(timer.poll_at(T0 + 100_000), 1400);
        // Past the end instant it saturates at zero.
        assert_eq!(timer.poll_at(T0 + 2_000_000), 0);
        // Polling mutated nothing.
        assert!(timer.running());
        assert_eq!(timer.poll_at(T0), 1500);
    }

    #[test]
    fn start_while_running_is_a_no_op() {
        let mut timer = focus_timer();
        assert!(timer.start_at(T0).unwrap().is_some());
        assert!(timer.start_at(T0 + 5_000).unwrap().is_none());
        // The end instant did not move.
        assert_eq!(timer.poll_at(T0 + 10_000), 1490);
    }

    #[test]
    fn focus_start_requires_a_selected_task() {
        let mut timer = CycleTimer::new(CycleSettings::default());
        assert!(matches!(
            timer.start_at(T0).unwrap_err(),
            CoreError::NoTaskSelected
        ));
        assert!(!timer.running());

        // Breaks start without a task.
        timer.set_mode(IntervalKind::ShortBreak);
        assert!(timer.start_at(T0).unwrap().is_some());

        // And so does focus once the policy is off.
        let mut settings = CycleSettings::default();
        settings.require_task_for_focus = false;
        let mut timer = CycleTimer::new(settings);
        assert!(timer.start_at(T0).unwrap().is_some());

        // Flipping the policy on a live timer governs the next start.
        timer.stop_at(T0 + 1_000);
        timer.set_require_task_for_focus(true);
        assert!(matches!(
            timer.start_at(T0 + 1_000).unwrap_err(),
            CoreError::NoTaskSelected
        ));
    }

    #[test]
    fn stop_freezes_and_resume_continues() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();

        let event = timer.stop_at(T0 + 100_000).unwrap();
        match event {
            Event::TimerStopped { remaining_secs, .. } => assert_eq!(remaining_secs, 1400),
            other => panic!("expected TimerStopped, got {other:?}"),
        }
        // Frozen: wall clock keeps moving, remaining does not.
        assert_eq!(timer.poll_at(T0 + 600_000), 1400);

        // Resume picks up the frozen value.
        timer.start_at(T0 + 600_000).unwrap();
        assert_eq!(timer.poll_at(T0 + 600_000), 1400);
        let end = T0 + 600_000 + 1_400_000;
        assert_eq!(timer.poll_at(end), 0);

        // Stopping while idle is a no-op.
        timer.stop_at(end).unwrap();
        assert!(timer.stop_at(end).is_none());
    }

    #[test]
    fn reset_restores_full_duration_and_keeps_counter() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();
        timer.complete_cycle_at(T0 + 1_500_000, no_credit).unwrap();
        assert_eq!(timer.focus_cycles(), 1);

        timer.start_at(T0 + 1_600_000).unwrap();
        timer.stop_at(T0 + 1_650_000);
        timer.reset();
        assert!(!timer.running());
        assert_eq!(timer.poll_at(T0), 300); // full short break again
        assert_eq!(timer.focus_cycles(), 1);
    }

    #[test]
    fn set_mode_stops_and_resets() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();

        let event = timer.set_mode(IntervalKind::LongBreak);
        match event {
            Event::ModeChanged { from, to, .. } => {
                assert_eq!(from, IntervalKind::Focus);
                assert_eq!(to, IntervalKind::LongBreak);
            }
            other => panic!("expected ModeChanged, got {other:?}"),
        }
        assert!(!timer.running());
        assert_eq!(timer.poll_at(T0), 900);
    }

    #[test]
    fn complete_cycle_is_a_no_op_unless_zero_while_running() {
        let mut timer = focus_timer();
        // Idle.
        assert!(timer.complete_cycle_at(T0, no_credit).unwrap().is_none());

        timer.start_at(T0).unwrap();
        // Running with time left.
        assert!(timer
            .complete_cycle_at(T0 + 100_000, no_credit)
            .unwrap()
            .is_none());
        assert!(timer.running());
        assert_eq!(timer.focus_cycles(), 0);
    }

    #[test]
    fn rotation_long_break_every_fourth() {
        let mut timer = focus_timer();
        let mut now = T0;
        for cycle in 1..=8u32 {
            timer.start_at(now).unwrap();
            now += 1_500_000;
            let event = timer.complete_cycle_at(now, no_credit).unwrap().unwrap();
            let expected_next = if cycle % 4 == 0 {
                IntervalKind::LongBreak
            } else {
                IntervalKind::ShortBreak
            };
            match event {
                Event::CycleCompleted {
                    finished,
                    next,
                    focus_cycles,
                    ..
                } => {
                    assert_eq!(finished, IntervalKind::Focus);
                    assert_eq!(next, expected_next);
                    assert_eq!(focus_cycles, cycle);
                }
                other => panic!("expected CycleCompleted, got {other:?}"),
            }
            assert!(!timer.running());

            // Run the break down; it always returns to focus.
            timer.start_at(now).unwrap();
            now += timer.settings().duration_ms(expected_next);
            let event = timer.complete_cycle_at(now, no_credit).unwrap().unwrap();
            match event {
                Event::CycleCompleted { finished, next, .. } => {
                    assert_eq!(finished, expected_next);
                    assert_eq!(next, IntervalKind::Focus);
                }
                other => panic!("expected CycleCompleted, got {other:?}"),
            }
        }
    }

    #[test]
    fn focus_completion_credits_selected_task() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();

        let mut credited = Vec::new();
        let event = timer
            .complete_cycle_at(T0 + 1_500_000, |id| {
                credited.push(id.to_string());
                Ok(())
            })
            .unwrap()
            .unwrap();
        assert_eq!(credited, vec!["task-1".to_string()]);
        match event {
            Event::CycleCompleted { credited_task, .. } => {
                assert_eq!(credited_task.as_deref(), Some("task-1"));
            }
            other => panic!("expected CycleCompleted, got {other:?}"),
        }
        // Selection survives an ordinary credit.
        assert_eq!(timer.selected_task(), Some("task-1"));
    }

    #[test]
    fn break_completion_never_credits() {
        let mut timer = focus_timer();
        timer.set_mode(IntervalKind::ShortBreak);
        timer.start_at(T0).unwrap();
        let event = timer
            .complete_cycle_at(T0 + 300_000, |_| panic!("break must not credit"))
            .unwrap()
            .unwrap();
        match event {
            Event::CycleCompleted {
                next, focus_cycles, ..
            } => {
                assert_eq!(next, IntervalKind::Focus);
                assert_eq!(focus_cycles, 0);
            }
            other => panic!("expected CycleCompleted, got {other:?}"),
        }
    }

    #[test]
    fn missing_task_is_swallowed_and_selection_cleared() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();

        let event = timer
            .complete_cycle_at(T0 + 1_500_000, |id| {
                Err(CoreError::NotFound { id: id.to_string() })
            })
            .unwrap()
            .unwrap();
        match event {
            Event::CycleCompleted {
                credited_task,
                next,
                focus_cycles,
                ..
            } => {
                assert_eq!(credited_task, None);
                assert_eq!(next, IntervalKind::ShortBreak);
                assert_eq!(focus_cycles, 1);
            }
            other => panic!("expected CycleCompleted, got {other:?}"),
        }
        assert_eq!(timer.selected_task(), None);
    }

    #[test]
    fn hard_credit_failure_surfaces_after_transition() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();

        let err = timer
            .complete_cycle_at(T0 + 1_500_000, |_| {
                Err(CoreError::Custom("store exploded".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Custom(_)));
        // The rotation still advanced.
        assert_eq!(timer.kind(), IntervalKind::ShortBreak);
        assert_eq!(timer.focus_cycles(), 1);
        assert!(!timer.running());
    }

    #[test]
    fn configure_rules() {
        let mut timer = focus_timer();

        // Idle reconfiguration of the current kind resets remaining.
        timer.configure(IntervalKind::Focus, 1800).unwrap();
        assert_eq!(timer.poll_at(T0), 1800);

        // Another kind is untouched by remaining.
        timer.start_at(T0).unwrap();
        timer.configure(IntervalKind::LongBreak, 1200).unwrap();
        assert_eq!(timer.poll_at(T0), 1800);

        // The actively running kind is locked.
        assert!(timer.configure(IntervalKind::Focus, 60).is_err());
        assert_eq!(timer.settings().focus_secs, 1800);

        // Zero durations are invalid everywhere.
        timer.stop_at(T0);
        assert!(timer.configure(IntervalKind::Focus, 0).is_err());
    }

    #[test]
    fn oversized_durations_saturate() {
        let mut timer = focus_timer();
        timer.configure(IntervalKind::Focus, u64::MAX / 999).unwrap();
        assert_eq!(timer.remaining_ms_at(T0), u64::MAX);

        // The end instant clamps at the ceiling instead of wrapping.
        timer.start_at(T0).unwrap();
        assert_eq!(timer.remaining_ms_at(T0), u64::MAX - T0);
        timer.stop_at(T0 + 1_000);
        assert_eq!(timer.remaining_ms_at(T0 + 1_000), u64::MAX - T0 - 1_000);
    }

    #[test]
    fn set_long_break_every_validates() {
        let mut timer = focus_timer();
        assert!(timer.set_long_break_every(0).is_err());
        timer.set_long_break_every(2).unwrap();

        let mut now = T0;
        for _ in 0..2 {
            timer.start_at(now).unwrap();
            now += 1_500_000;
            timer.complete_cycle_at(now, no_credit).unwrap();
            if timer.kind().is_break() {
                timer.set_mode(IntervalKind::Focus);
            }
        }
        assert_eq!(timer.focus_cycles(), 2);
    }

    #[test]
    fn serializes_round_trip() {
        let mut timer = focus_timer();
        timer.start_at(T0).unwrap();
        let json = serde_json::to_string(&timer).unwrap();
        let restored: CycleTimer = serde_json::from_str(&json).unwrap();
        assert!(restored.running());
        assert_eq!(restored.poll_at(T0 + 100_000), 1400);
        assert_eq!(restored.selected_task(), Some("task-1"));
    }
}
