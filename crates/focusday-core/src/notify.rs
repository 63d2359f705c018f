//! Boundary to whatever renders completion alerts (terminal bell, desktop
//! notification, sound).

use std::cell::RefCell;
use std::rc::Rc;

use crate::session::SessionType;

/// Receives session lifecycle signals. The core calls
/// [`Notifier::session_completed`] exactly once per completed session.
pub trait Notifier {
    /// Called when a session completes. `task_title` is set for focus
    /// sessions linked to a task.
    fn session_completed(&self, session_type: SessionType, task_title: Option<&str>);

    /// Called when a session starts.
    fn session_started(&self, _session_type: SessionType, _planned_minutes: u32) {}
}

/// Swallows every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn session_completed(&self, _session_type: SessionType, _task_title: Option<&str>) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub session_type: SessionType,
    pub task_title: Option<String>,
}

/// Keeps every completion it receives. Clones share the same log, so a test
/// can hand one clone to the app and read from another.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    log: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.log.borrow().len()
    }
}

impl Notifier for RecordingNotifier {
    fn session_completed(&self, session_type: SessionType, task_title: Option<&str>) {
        self.log.borrow_mut().push(Notification {
            session_type,
            task_title: task_title.map(str::to_string),
        });
    }
}
