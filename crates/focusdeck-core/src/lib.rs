//! # Focusdeck Core Library
//!
//! Task list and focus cycle engine shared by every Focusdeck frontend.
//!
//! ## Architecture
//!
//! - **task / store**: Task records, validation policy, and the `TaskStore`
//!   contract with in-memory and SQLite backends
//! - **timer**: Wall-clock focus/break cycle timer with long-break rotation
//! - **session**: Binds a timer to a store and routes focus credit
//! - **storage**: TOML configuration and the SQLite database under
//!   `~/.config/focusdeck/`
//! - **events**: Serialized notifications emitted by timer transitions

pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use session::Session;
pub use storage::{Config, TaskDb};
pub use store::{MemoryStore, StorePolicy, TaskStore};
pub use task::{NewTask, Priority, Task, TaskFilter, TaskPatch, TaskSummary};
pub use timer::{CycleSettings, CycleTimer, IntervalKind};
