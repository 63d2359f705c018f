//! The whole persisted application state.

use chrono::{DateTime, Utc};

use crate::prefs::UserPrefs;
use crate::session::{Session, SessionLog, INTERRUPTED_NOTE};
use crate::task::{Task, TaskStore};

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub tasks: TaskStore,
    pub sessions: SessionLog,
    pub user_prefs: UserPrefs,
    pub is_in_focus_mode: bool,
    pub current_task_id: Option<String>,
}

impl AppState {
    pub fn current_session(&self) -> Option<&Session> {
        self.sessions.current()
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.get(self.current_task_id.as_deref()?)
    }

    /// New-day cleanup. Clears MIT flags and any open session; tasks and
    /// history are otherwise kept.
    pub fn reset_daily(&mut self, now: DateTime<Utc>) -> Option<Session> {
        self.tasks.reset_daily(now);
        let interrupted = self.sessions.complete(Some(INTERRUPTED_NOTE.to_string()), false, now);
        self.is_in_focus_mode = false;
        self.current_task_id = None;
        interrupted
    }
}
