mod cycle;
mod settings;

pub use cycle::CycleTimer;
pub use settings::{CycleSettings, IntervalKind};
