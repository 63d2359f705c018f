use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionType;

/// Every state change in the system produces an Event.
/// Front ends render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        total_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown discarded; remaining restored to the total.
    TimerStopped {
        at: DateTime<Utc>,
    },
    TimerReset {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerExtended {
        added_secs: u64,
        total_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReduced {
        removed_secs: u64,
        total_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerSnoozed {
        added_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        total_secs: u64,
        extended: bool,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session_id: String,
        session_type: SessionType,
        task_id: Option<String>,
        planned_minutes: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        session_type: SessionType,
        duration_min: f64,
        completed_early: bool,
        extended: bool,
        at: DateTime<Utc>,
    },
    /// A follow-on session will start when the grace countdown runs out.
    AutoResumeScheduled {
        session_type: SessionType,
        task_id: Option<String>,
        planned_minutes: Option<u32>,
        grace_secs: u32,
        at: DateTime<Utc>,
    },
    AutoResumeCancelled {
        session_type: SessionType,
        at: DateTime<Utc>,
    },
    DailyReset {
        at: DateTime<Utc>,
    },
    DataWiped {
        at: DateTime<Utc>,
    },
}
