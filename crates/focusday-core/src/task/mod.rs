//! Task, subtask and MIT types.
//!
//! Status transitions are unrestricted: any status can move to any other,
//! and completed tasks can be reopened.
//!
//! ```text
//!   todo <──> in_progress <──> completed
//!     ^                            ^
//!     +────────────────────────────+
//! ```

mod store;

pub use store::TaskStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::day_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P2
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "P1" | "1" => Ok(Priority::P1),
            "P2" | "2" => Ok(Priority::P2),
            "P3" | "3" => Ok(Priority::P3),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatFrequency {
    Daily,
    Weekdays,
    Weekly,
}

/// Recurrence carried on a task. Stored and shown; nothing spawns repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatConfig {
    pub frequency: RepeatFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_pomos: Option<u32>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub is_mit: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Manual position; tasks without one fall back to the default ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(rename = "due", alias = "deadline", default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Counts toward the single-active-MIT rule.
    pub fn is_active_mit(&self) -> bool {
        self.is_mit && !self.is_completed()
    }

    /// Completed tasks record their completion time in `updated_at`.
    pub fn completed_on(&self, day: NaiveDate) -> bool {
        self.is_completed() && day_key(self.updated_at) == day
    }

    pub fn is_due_by(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(true, |d| d <= now)
    }

    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }
}

/// Fields a caller supplies when creating a task; the store assigns the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimate_pomos: Option<u32>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub is_mit: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repeat: Option<RepeatConfig>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn estimate(mut self, pomos: u32) -> Self {
        self.estimate_pomos = Some(pomos);
        self
    }

    pub fn deadline(mut self, at: DateTime<Utc>) -> Self {
        self.deadline = Some(at);
        self
    }

    pub fn mit(mut self) -> Self {
        self.is_mit = true;
        self
    }
}

/// Partial update. `None` leaves a field alone; for optional fields
/// `Some(None)` clears it. MIT is changed only through `set_mit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub estimate_pomos: Option<Option<u32>>,
    pub status: Option<TaskStatus>,
    pub sort_order: Option<Option<i64>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub repeat: Option<Option<RepeatConfig>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(Some(notes.into())),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// Trim tags and drop blanks and repeats, keeping first-seen order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_by_severity() {
        assert!(Priority::P1 < Priority::P2);
        assert!(Priority::P2 < Priority::P3);
        assert_eq!("p1".parse::<Priority>(), Ok(Priority::P1));
        assert_eq!(Priority::P3.to_string(), "P3");
    }

    #[test]
    fn tags_are_deduplicated_in_order() {
        let tags = normalize_tags(vec!["work".into(), " home ".into(), "work".into(), "".into()]);
        assert_eq!(tags, vec!["work".to_string(), "home".to_string()]);
    }

    #[test]
    fn deadline_reads_original_due_field() {
        let json = r#"{
            "id": "a", "title": "Write", "tags": [], "priority": "P1",
            "status": "in_progress", "is_mit": false,
            "due": "2026-01-02T03:04:05Z",
            "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.deadline.is_some());
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn status_parses_cli_aliases() {
        assert_eq!("done".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
        assert_eq!("doing".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
    }
}
