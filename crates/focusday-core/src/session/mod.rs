//! Session records and the lifecycle that opens and closes them.
//!
//! A [`SessionLog`] keeps the full history plus a pointer to the one session
//! that is still open. Closing always goes through the id stored in that
//! pointer, so a stale copy of the session can never be written back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::day_key;
use crate::prefs::UserPrefs;

/// Sessions shorter than this fraction of their plan count as early.
pub const EARLY_COMPLETION_RATIO: f64 = 0.8;

/// Floor applied to recorded durations so instant completions still register.
pub const MIN_DURATION_MINUTES: f64 = 0.1;

/// Note written onto a session that was closed without finishing.
pub const INTERRUPTED_NOTE: &str = "Session interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Focus)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Focus => "Focus Session",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(SessionType::Focus),
            "short_break" | "short" => Ok(SessionType::ShortBreak),
            "long_break" | "long" => Ok(SessionType::LongBreak),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Quick focus sessions have no task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub start_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    /// Minutes elapsed, one decimal. Zero until completed.
    #[serde(default)]
    pub duration: f64,
    /// Minutes.
    pub planned_duration: u32,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_early: bool,
    #[serde(default)]
    pub extended: bool,
}

impl Session {
    /// Actual over planned duration; 0 when nothing was planned.
    pub fn completion_rate(&self) -> f64 {
        if self.planned_duration == 0 {
            return 0.0;
        }
        self.duration / f64::from(self.planned_duration)
    }

    pub fn started_on(&self, day: NaiveDate) -> bool {
        day_key(self.start_at) == day
    }
}

/// Result of opening a session.
#[derive(Debug, Clone)]
pub struct Started {
    pub session: Session,
    /// The previously open session, closed as interrupted to make room.
    pub interrupted: Option<Session>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    sessions: Vec<Session>,
    current: Option<String>,
}

impl SessionLog {
    /// Rebuild from persisted history. Nothing is open afterwards: a record
    /// left open by a previous run cannot be resumed, so it is sealed as an
    /// interrupted session of minimum length.
    pub fn from_history(mut sessions: Vec<Session>) -> Self {
        for orphan in sessions.iter_mut().filter(|s| !s.completed) {
            orphan.end_at = Some(orphan.start_at);
            orphan.duration = MIN_DURATION_MINUTES;
            orphan.completed = true;
            orphan.completed_early =
                MIN_DURATION_MINUTES < f64::from(orphan.planned_duration) * EARLY_COMPLETION_RATIO;
            orphan.notes.get_or_insert_with(|| INTERRUPTED_NOTE.to_string());
            tracing::warn!(session_id = %orphan.id, "sealed session left open by a previous run");
        }
        Self {
            sessions,
            current: None,
        }
    }

    pub fn history(&self) -> &[Session] {
        &self.sessions
    }

    pub fn into_history(self) -> Vec<Session> {
        self.sessions
    }

    pub fn current(&self) -> Option<&Session> {
        let id = self.current.as_deref()?;
        self.find(id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn find(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn last(&self) -> Option<&Session> {
        self.sessions.last()
    }

    /// Sessions started on a local calendar day, in history order.
    pub fn started_on(&self, day: NaiveDate) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(move |s| s.started_on(day))
    }

    /// Completed focus sessions started on a day, in history order.
    pub fn completed_focus_on(&self, day: NaiveDate) -> impl Iterator<Item = &Session> {
        self.started_on(day)
            .filter(|s| s.completed && s.session_type == SessionType::Focus)
    }

    /// Open a new session and make it current.
    ///
    /// A session that is still open gets closed first with
    /// [`INTERRUPTED_NOTE`], so history never holds two open records.
    pub fn start(
        &mut self,
        session_type: SessionType,
        task_id: Option<String>,
        custom_planned_minutes: Option<u32>,
        prefs: &UserPrefs,
        now: DateTime<Utc>,
    ) -> Started {
        let interrupted = if self.current.is_some() {
            self.complete(Some(INTERRUPTED_NOTE.to_string()), false, now)
        } else {
            None
        };

        let planned_duration = custom_planned_minutes
            .filter(|m| *m > 0)
            .unwrap_or_else(|| prefs.length_for(session_type));

        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            task_id,
            start_at: now,
            end_at: None,
            duration: 0.0,
            planned_duration,
            session_type,
            notes: None,
            completed: false,
            completed_early: false,
            extended: false,
        };
        tracing::debug!(
            session_id = %session.id,
            ?session_type,
            planned_duration,
            "session started"
        );
        self.current = Some(session.id.clone());
        self.sessions.push(session.clone());
        Started {
            session,
            interrupted,
        }
    }

    /// Close the current session. `None` when nothing is open.
    pub fn complete(
        &mut self,
        notes: Option<String>,
        was_extended: bool,
        now: DateTime<Utc>,
    ) -> Option<Session> {
        let id = self.current.take()?;
        let record = self.sessions.iter_mut().find(|s| s.id == id)?;

        let duration = elapsed_minutes(record.start_at, now);
        record.end_at = Some(now);
        record.duration = duration;
        record.completed = true;
        record.completed_early =
            duration < f64::from(record.planned_duration) * EARLY_COMPLETION_RATIO;
        record.extended = was_extended;
        record.notes = notes;

        tracing::debug!(
            session_id = %record.id,
            duration,
            completed_early = record.completed_early,
            "session completed"
        );
        Some(record.clone())
    }

    pub fn open_count(&self) -> usize {
        self.sessions.iter().filter(|s| !s.completed).count()
    }
}

/// Wall-clock minutes between two instants, rounded to one decimal and
/// floored at [`MIN_DURATION_MINUTES`].
pub fn elapsed_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0) as f64;
    let minutes = (millis / 1000.0 / 60.0 * 10.0).round() / 10.0;
    minutes.max(MIN_DURATION_MINUTES)
}
