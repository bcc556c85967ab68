use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Interval kinds the cycle rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Focus,
    ShortBreak,
    LongBreak,
}

impl IntervalKind {
    pub fn is_focus(self) -> bool {
        self == IntervalKind::Focus
    }

    pub fn is_break(self) -> bool {
        !self.is_focus()
    }

    /// Human-readable label for countdown displays.
    pub fn label(self) -> &'static str {
        match self {
            IntervalKind::Focus => "Focus",
            IntervalKind::ShortBreak => "Short break",
            IntervalKind::LongBreak => "Long break",
        }
    }
}

impl std::fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntervalKind::Focus => "focus",
            IntervalKind::ShortBreak => "short_break",
            IntervalKind::LongBreak => "long_break",
        };
        write!(f, "{s}")
    }
}

/// Durations and rotation rules for one cycle timer.
///
/// Durations are whole seconds, at least one each. `long_break_every` is
/// the rotation modulus: every Nth completed focus interval is followed by
/// a long break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSettings {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    pub long_break_every: u32,
    /// Reject starting a focus interval when no task is selected.
    pub require_task_for_focus: bool,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            focus_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_every: 4,
            require_task_for_focus: true,
        }
    }
}

impl CycleSettings {
    pub fn duration_secs(&self, kind: IntervalKind) -> u64 {
        match kind {
            IntervalKind::Focus => self.focus_secs,
            IntervalKind::ShortBreak => self.short_break_secs,
            IntervalKind::LongBreak => self.long_break_secs,
        }
    }

    /// Duration in milliseconds, saturating at `u64::MAX` so an oversized
    /// configured value cannot overflow the end-instant arithmetic.
    pub fn duration_ms(&self, kind: IntervalKind) -> u64 {
        self.duration_secs(kind).saturating_mul(1000)
    }

    pub(crate) fn set_duration_secs(&mut self, kind: IntervalKind, secs: u64) -> Result<()> {
        check_duration(duration_field(kind), secs)?;
        match kind {
            IntervalKind::Focus => self.focus_secs = secs,
            IntervalKind::ShortBreak => self.short_break_secs = secs,
            IntervalKind::LongBreak => self.long_break_secs = secs,
        }
        Ok(())
    }

    /// Reject zero durations and a zero rotation modulus.
    pub fn validate(&self) -> Result<()> {
        check_duration("focus_secs", self.focus_secs)?;
        check_duration("short_break_secs", self.short_break_secs)?;
        check_duration("long_break_secs", self.long_break_secs)?;
        if self.long_break_every == 0 {
            return Err(ValidationError::InvalidValue {
                field: "long_break_every".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn duration_field(kind: IntervalKind) -> &'static str {
    match kind {
        IntervalKind::Focus => "focus_secs",
        IntervalKind::ShortBreak => "short_break_secs",
        IntervalKind::LongBreak => "long_break_secs",
    }
}

fn check_duration(field: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "must be at least 1 second".to_string(),
        }
        .into());
    }
    Ok(())
}
