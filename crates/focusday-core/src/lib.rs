//! # focusday core library
//!
//! Business logic for a Pomodoro planner built around one Most Important Task
//! (MIT) per day. The `focusday` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Countdown timer**: a tick-driven state machine; the caller invokes
//!   `tick()` once per second
//! - **Sessions**: focus and break records, closed from wall-clock time
//! - **Adaptive breaks**: break length nudged by today's focus behaviour
//! - **Auto-resume**: focus, break, focus chaining with a grace countdown
//! - **Storage**: the whole state as a JSON blob in a SQLite key-value table,
//!   plus a TOML config file
//!
//! ## Key Components
//!
//! - [`FocusApp`]: owns the state; every mutation goes through it
//! - [`CountdownTimer`]: the per-session countdown
//! - [`KeyboardBinding`]: key presses to timer commands
//! - [`Database`] / [`MemoryStore`]: [`KeyValueStore`] implementations
//! - [`Config`]: application configuration

pub mod app;
pub mod breaks;
pub mod clock;
pub mod error;
pub mod events;
pub mod keyboard;
pub mod notify;
pub mod prefs;
pub mod sequencer;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use app::{CompletionOutcome, CompletionRequest, FocusApp, NextStep, TickOutcome};
pub use breaks::{calculate_adaptive_break_duration, BreakType};
pub use clock::{day_key, Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use keyboard::{InputFocus, Key, KeyCommand, KeyboardBinding, TimerControls};
pub use notify::{NoopNotifier, Notifier, RecordingNotifier};
pub use prefs::UserPrefs;
pub use sequencer::{AutoResumeSequencer, PendingSession};
pub use session::{Session, SessionLog, SessionType};
pub use state::AppState;
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
pub use task::{Priority, Subtask, SubtaskPatch, Task, TaskDraft, TaskPatch, TaskStatus, TaskStore};
pub use timer::{CountdownTimer, TimerState};
