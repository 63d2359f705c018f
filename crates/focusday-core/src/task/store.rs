//! In-memory task collection and its mutations.
//!
//! Every method takes the instant to stamp explicitly; callers pass the
//! application clock. Unknown ids leave the collection untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::{normalize_tags, Subtask, SubtaskPatch, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Create a task at the front of the list.
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task, ValidationError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if draft.is_mit {
            self.clear_mit_flags();
        }
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
            tags: normalize_tags(draft.tags),
            priority: draft.priority,
            estimate_pomos: draft.estimate_pomos,
            status: draft.status,
            is_mit: draft.is_mit,
            subtasks: Vec::new(),
            sort_order: None,
            deadline: draft.deadline,
            repeat: draft.repeat,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(task_id = %task.id, "task created");
        self.tasks.insert(0, task);
        Ok(&self.tasks[0])
    }

    /// Merge `patch` into a task. `Ok(false)` when the id is unknown.
    ///
    /// `updated_at` moves only when the patch completes a task that was not
    /// completed, so it doubles as the completion timestamp.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch, now: DateTime<Utc>) -> Result<bool, ValidationError> {
        let title = match patch.title {
            Some(t) if t.trim().is_empty() => return Err(ValidationError::EmptyTitle),
            Some(t) => Some(t.trim().to_string()),
            None => None,
        };
        let Some(task) = self.get_mut(id) else {
            return Ok(false);
        };

        let completing = patch.status == Some(TaskStatus::Completed) && !task.is_completed();
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(notes) = patch.notes {
            task.notes = notes;
        }
        if let Some(tags) = patch.tags {
            task.tags = normalize_tags(tags);
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(estimate) = patch.estimate_pomos {
            task.estimate_pomos = estimate;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(order) = patch.sort_order {
            task.sort_order = order;
        }
        if let Some(deadline) = patch.deadline {
            task.deadline = deadline;
        }
        if let Some(repeat) = patch.repeat {
            task.repeat = repeat;
        }
        if completing {
            task.updated_at = now;
        }
        Ok(true)
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Flip between completed and todo.
    pub fn toggle_complete(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(status) = self.get(id).map(|t| t.status) else {
            return false;
        };
        let next = if status == TaskStatus::Completed {
            TaskStatus::Todo
        } else {
            TaskStatus::Completed
        };
        matches!(self.update_task(id, TaskPatch::status(next), now), Ok(true))
    }

    /// Make `task_id` the only MIT. An empty id clears the MIT.
    ///
    /// Only the new MIT gets a fresh `updated_at`; tasks losing the flag keep
    /// theirs.
    pub fn set_mit(&mut self, task_id: &str, now: DateTime<Utc>) -> bool {
        if task_id.is_empty() {
            self.clear_mit_flags();
            return true;
        }
        if self.get(task_id).is_none() {
            return false;
        }
        for task in &mut self.tasks {
            if task.id == task_id {
                task.is_mit = true;
                task.updated_at = now;
            } else {
                task.is_mit = false;
            }
        }
        true
    }

    fn clear_mit_flags(&mut self) {
        for task in &mut self.tasks {
            task.is_mit = false;
        }
    }

    /// The active MIT, if any.
    pub fn mit(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.is_active_mit())
    }

    /// The MIT completed on `today`, if any.
    pub fn completed_mit(&self, today: NaiveDate) -> Option<&Task> {
        self.tasks.iter().find(|t| t.is_mit && t.completed_on(today))
    }

    /// Tasks due by `now` (or undated), in display order.
    pub fn today_tasks(&self, now: DateTime<Utc>) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.is_due_by(now)).collect();
        tasks.sort_by(|a, b| today_order(a, b));
        tasks
    }

    pub fn active_today_tasks(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.today_tasks(now)
            .into_iter()
            .filter(|t| !t.is_completed())
            .collect()
    }

    pub fn completed_on(&self, day: NaiveDate) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.completed_on(day))
    }

    /// Append a subtask. `None` for a blank title or unknown task.
    pub fn add_subtask(&mut self, task_id: &str, title: &str, now: DateTime<Utc>) -> Option<Subtask> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let task = self.get_mut(task_id)?;
        let subtask = Subtask {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
            created_at: now,
        };
        task.subtasks.push(subtask.clone());
        task.updated_at = now;
        Some(subtask)
    }

    pub fn update_subtask(
        &mut self,
        task_id: &str,
        subtask_id: &str,
        patch: SubtaskPatch,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(task) = self.get_mut(task_id) else {
            return false;
        };
        let Some(subtask) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            return false;
        };
        if let Some(title) = patch.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            subtask.title = title.to_string();
        }
        if let Some(completed) = patch.completed {
            subtask.completed = completed;
        }
        task.updated_at = now;
        true
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str, now: DateTime<Utc>) -> bool {
        let Some(task) = self.get_mut(task_id) else {
            return false;
        };
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.id != subtask_id);
        if task.subtasks.len() == before {
            return false;
        }
        task.updated_at = now;
        true
    }

    /// Give each listed task its index as `sort_order`. Unlisted tasks keep
    /// their position.
    pub fn reorder_tasks<S: AsRef<str>>(&mut self, ordered_ids: &[S], now: DateTime<Utc>) -> usize {
        let mut changed = 0;
        for (index, id) in ordered_ids.iter().enumerate() {
            let order = Some(index as i64);
            if let Some(task) = self.get_mut(id.as_ref()) {
                if task.sort_order != order {
                    task.sort_order = order;
                    task.updated_at = now;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// New-day cleanup: no MIT carries over. Completed tasks keep their
    /// completion timestamp.
    pub fn reset_daily(&mut self, now: DateTime<Utc>) {
        for task in &mut self.tasks {
            task.is_mit = false;
            if !task.is_completed() {
                task.updated_at = now;
            }
        }
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

/// Completed last, then manual order, then MIT, newest first, priority.
fn today_order(a: &Task, b: &Task) -> Ordering {
    match (a.is_completed(), b.is_completed()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    match (a.sort_order, b.sort_order) {
        (Some(x), Some(y)) => return x.cmp(&y),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => {}
    }
    match (a.is_mit, b.is_mit) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.priority.cmp(&b.priority))
}
