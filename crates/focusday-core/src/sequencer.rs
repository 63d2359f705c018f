//! What runs after a session ends.
//!
//! ```text
//!   focus done ──> [grace] ──> short/long break ──> [grace] ──> focus (same task)
//!        │                          │
//!        └── continue ──> focus     └── auto_resume off / no task ──> manual
//! ```
//!
//! The sequencer only decides. It hands the session to open back to the
//! caller as a [`PendingSession`]; the caller owns the session log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::breaks::{calculate_adaptive_break_duration, BreakType};
use crate::clock::day_key;
use crate::events::Event;
use crate::prefs::UserPrefs;
use crate::session::{Session, SessionType};

/// Seconds between a completion and the automatic start of the next session.
pub const DEFAULT_GRACE_SECS: u32 = 10;

/// A session waiting to be opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSession {
    pub session_type: SessionType,
    pub task_id: Option<String>,
    /// Overrides the preference length (adaptive breaks).
    pub planned_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Grace {
    next: PendingSession,
    remaining_secs: u32,
}

#[derive(Debug, Clone)]
pub struct AutoResumeSequencer {
    grace_secs: u32,
    completed_pomodoros: u32,
    counter_day: Option<NaiveDate>,
    /// Type the next manually started session defaults to.
    pending_type: SessionType,
    /// Task of the focus session that led into the current break.
    resume_task: Option<String>,
    grace: Option<Grace>,
}

impl Default for AutoResumeSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_SECS)
    }
}

impl AutoResumeSequencer {
    pub fn new(grace_secs: u32) -> Self {
        Self {
            grace_secs: grace_secs.max(1),
            completed_pomodoros: 0,
            counter_day: None,
            pending_type: SessionType::Focus,
            resume_task: None,
            grace: None,
        }
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    pub fn pending_type(&self) -> SessionType {
        self.pending_type
    }

    pub fn grace_secs(&self) -> u32 {
        self.grace_secs
    }

    pub fn is_counting_down(&self) -> bool {
        self.grace.is_some()
    }

    pub fn grace_remaining(&self) -> Option<u32> {
        self.grace.as_ref().map(|g| g.remaining_secs)
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        self.grace.as_ref().map(|g| &g.next)
    }

    /// Zero the counter when the latest session did not start on `today`.
    pub fn observe_history(&mut self, history: &[Session], today: NaiveDate) {
        let started_today = history.last().map_or(false, |s| s.started_on(today));
        if !started_today {
            self.completed_pomodoros = 0;
            self.counter_day = None;
        }
    }

    /// A focus session just ended. `history` must already contain it.
    pub fn on_focus_completed(
        &mut self,
        task_id: Option<String>,
        history: &[Session],
        prefs: &UserPrefs,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        let today = day_key(now);
        if self.counter_day != Some(today) {
            self.completed_pomodoros = 0;
            self.counter_day = Some(today);
        }
        self.completed_pomodoros += 1;
        self.resume_task = task_id;
        self.grace = None;

        let break_type = if self.completed_pomodoros % prefs.cycles() == 0 {
            BreakType::LongBreak
        } else {
            BreakType::ShortBreak
        };
        let session_type = SessionType::from(break_type);
        tracing::debug!(
            completed = self.completed_pomodoros,
            ?session_type,
            "focus completed"
        );

        if !prefs.auto_resume {
            self.pending_type = session_type;
            return None;
        }
        let minutes = calculate_adaptive_break_duration(break_type, history, prefs, today);
        self.schedule(
            PendingSession {
                session_type,
                task_id: None,
                planned_minutes: Some(minutes),
            },
            now,
        )
    }

    /// A break just ended. Resumes focus on the task worked before the
    /// break, when there was one and auto-resume is on.
    pub fn on_break_completed(&mut self, prefs: &UserPrefs, now: DateTime<Utc>) -> Option<Event> {
        self.grace = None;
        match self.resume_task.clone() {
            Some(task_id) if prefs.auto_resume => self.schedule(
                PendingSession {
                    session_type: SessionType::Focus,
                    task_id: Some(task_id),
                    planned_minutes: None,
                },
                now,
            ),
            _ => {
                self.pending_type = SessionType::Focus;
                None
            }
        }
    }

    /// A task was deleted. Nothing resumes onto it afterwards.
    pub fn forget_task(&mut self, task_id: &str) {
        if self.resume_task.as_deref() == Some(task_id) {
            self.resume_task = None;
        }
        if let Some(grace) = self.grace.as_mut() {
            if grace.next.task_id.as_deref() == Some(task_id) {
                grace.next.task_id = None;
            }
        }
    }

    /// "Continue with another pomodoro": drop any sequencing, the caller
    /// opens focus right away. The counter is left alone.
    pub fn bypass(&mut self) {
        self.grace = None;
        self.pending_type = SessionType::Focus;
    }

    fn schedule(&mut self, next: PendingSession, now: DateTime<Utc>) -> Option<Event> {
        self.pending_type = next.session_type;
        let event = Event::AutoResumeScheduled {
            session_type: next.session_type,
            task_id: next.task_id.clone(),
            planned_minutes: next.planned_minutes,
            grace_secs: self.grace_secs,
            at: now,
        };
        self.grace = Some(Grace {
            next,
            remaining_secs: self.grace_secs,
        });
        Some(event)
    }

    /// One second of grace. Returns the session to open once it runs out.
    pub fn tick(&mut self) -> Option<PendingSession> {
        let grace = self.grace.as_mut()?;
        grace.remaining_secs = grace.remaining_secs.saturating_sub(1);
        if grace.remaining_secs > 0 {
            return None;
        }
        self.start_now()
    }

    /// Skip the rest of the grace period.
    pub fn start_now(&mut self) -> Option<PendingSession> {
        let grace = self.grace.take()?;
        if grace.next.session_type == SessionType::Focus {
            self.resume_task = None;
        }
        Some(grace.next)
    }

    /// Abandon the countdown. The pending type stays, nothing starts.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let grace = self.grace.take()?;
        self.pending_type = grace.next.session_type;
        tracing::debug!(session_type = ?self.pending_type, "auto-resume cancelled");
        Some(Event::AutoResumeCancelled {
            session_type: self.pending_type,
            at: now,
        })
    }

    /// Back to a fresh day: no countdown, focus next, counter at zero.
    pub fn reset(&mut self) {
        *self = Self::new(self.grace_secs);
    }
}
