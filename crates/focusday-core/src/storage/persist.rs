//! Saving and restoring [`AppState`] through a key-value store.
//!
//! The state is one JSON blob under [`STATE_KEY`]; the local day of the last
//! save sits under [`LAST_ACTIVITY_KEY`]. Loading never fails: unreadable
//! parts of the blob fall back to their defaults one field at a time.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::Database;
use crate::clock::{day_key, format_day_key, parse_day_key};
use crate::error::Result;
use crate::prefs::UserPrefs;
use crate::session::{Session, SessionLog};
use crate::state::AppState;
use crate::task::{Priority, Task, TaskStatus, TaskStore};

pub const STATE_KEY: &str = "focus-app-state";
pub const LAST_ACTIVITY_KEY: &str = "focus-app-last-activity";

/// Durable string storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv_get(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        Ok(self.kv_set(key, value)?)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        Ok(self.kv_delete(key)?)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Process-local store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredState<'a> {
    tasks: &'a [Task],
    sessions: &'a [Session],
    current_session: Option<&'a Session>,
    user_prefs: &'a UserPrefs,
    is_in_focus_mode: bool,
    current_task_id: Option<&'a str>,
}

/// Result of [`load_state`].
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub state: AppState,
    /// The stored day differed from today and the daily reset ran.
    pub daily_reset: bool,
}

/// Write the state blob and stamp today as the last-activity day.
pub fn save_state<S: KeyValueStore + ?Sized>(store: &mut S, state: &AppState, now: DateTime<Utc>) -> Result<()> {
    let stored = StoredState {
        tasks: state.tasks.all(),
        sessions: state.sessions.history(),
        current_session: state.sessions.current(),
        user_prefs: &state.user_prefs,
        is_in_focus_mode: state.is_in_focus_mode,
        current_task_id: state.current_task_id.as_deref(),
    };
    let json = serde_json::to_string(&stored)?;
    store.set(STATE_KEY, &json)?;
    store.set(LAST_ACTIVITY_KEY, &format_day_key(day_key(now)))?;
    Ok(())
}

/// Restore the state. No session is open afterwards and focus mode is off.
///
/// When the last-activity day is set and is not today, the daily reset runs
/// on a non-empty task list and the result is written back.
pub fn load_state<S: KeyValueStore + ?Sized>(store: &mut S, now: DateTime<Utc>) -> LoadOutcome {
    let raw = store.get(STATE_KEY).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to read stored state");
        None
    });
    let mut state = raw.as_deref().map(parse_state).unwrap_or_default();

    let today = day_key(now);
    let last_activity = store.get(LAST_ACTIVITY_KEY).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to read last activity day");
        None
    });
    let new_day = last_activity.map_or(false, |raw| parse_day_key(&raw) != Some(today));

    let mut daily_reset = false;
    if new_day && !state.tasks.is_empty() {
        state.reset_daily(now);
        daily_reset = true;
        tracing::info!(%today, "daily reset on load");
        if let Err(e) = save_state(store, &state, now) {
            tracing::warn!(error = %e, "failed to persist daily reset");
        }
    } else if new_day {
        if let Err(e) = store.set(LAST_ACTIVITY_KEY, &format_day_key(today)) {
            tracing::warn!(error = %e, "failed to record activity day");
        }
    }

    LoadOutcome { state, daily_reset }
}

fn parse_state(raw: &str) -> AppState {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "stored state is not valid JSON, starting empty");
            return AppState::default();
        }
    };

    let tasks: Vec<Task> = parse_list(&value, "tasks", recover_task);
    let sessions: Vec<Session> = parse_list(&value, "sessions", |_| None);
    let user_prefs = field(&value, &["userPrefs", "user_prefs"])
        .map(|stored| merge_fields(UserPrefs::default(), stored, "userPrefs"))
        .unwrap_or_default();

    AppState {
        tasks: TaskStore::from_tasks(tasks),
        sessions: SessionLog::from_history(sessions),
        user_prefs,
        is_in_focus_mode: false,
        current_task_id: None,
    }
}

fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| value.get(*name))
}

/// Entries that fail to parse go through `recover`; the ones it gives up on
/// are dropped.
fn parse_list<T, F>(value: &Value, name: &str, recover: F) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(&Value) -> Option<T>,
{
    let Some(Value::Array(items)) = value.get(name) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                let recovered = recover(item);
                if recovered.is_none() {
                    tracing::warn!(list = name, error = %e, "dropping unreadable entry");
                }
                recovered
            }
        })
        .collect()
}

/// Rebuild a task around its identity. `id`, `title` and both timestamps
/// must be readable; every other field keeps its stored value when it
/// parses and its default when it does not.
fn recover_task(stored: &Value) -> Option<Task> {
    let text = |name: &str| stored.get(name)?.as_str().map(str::to_string);
    let instant = |name: &str| -> Option<DateTime<Utc>> {
        serde_json::from_value(stored.get(name)?.clone()).ok()
    };
    let base = Task {
        id: text("id")?,
        title: text("title")?,
        notes: None,
        tags: Vec::new(),
        priority: Priority::default(),
        estimate_pomos: None,
        status: TaskStatus::default(),
        is_mit: false,
        subtasks: Vec::new(),
        sort_order: None,
        deadline: None,
        repeat: None,
        created_at: instant("created_at")?,
        updated_at: instant("updated_at")?,
    };
    Some(merge_fields(base, stored, "tasks"))
}

/// Overlay each stored key onto `base`, one at a time. Keys whose value
/// does not fit are logged and skipped.
fn merge_fields<T>(base: T, stored: &Value, what: &str) -> T
where
    T: Serialize + DeserializeOwned,
{
    let Value::Object(fields) = stored else {
        tracing::warn!(what, "stored value is not an object, using defaults");
        return base;
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(&base) else {
        return base;
    };
    let mut current = base;
    for (key, value) in fields {
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value.clone());
        match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
            Ok(parsed) => {
                merged = candidate;
                current = parsed;
            }
            Err(e) => tracing::warn!(what, key = %key, error = %e, "ignoring unreadable field"),
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::session::SessionType;
    use crate::task::TaskDraft;
    use chrono::Duration;

    fn sample_state(clock: &ManualClock) -> AppState {
        let mut state = AppState::default();
        let id = state
            .tasks
            .create_task(TaskDraft::new("write"), clock.now())
            .unwrap()
            .id
            .clone();
        state.tasks.set_mit(&id, clock.now());
        state.tasks.add_subtask(&id, "outline", clock.now());
        state
            .sessions
            .start(SessionType::Focus, Some(id.clone()), None, &state.user_prefs, clock.now());
        state.is_in_focus_mode = true;
        state.current_task_id = Some(id);
        state.user_prefs.pomo_length = 50;
        state
    }

    #[test]
    fn roundtrip_clears_active_session() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        let state = sample_state(&clock);
        save_state(&mut store, &state, clock.now()).unwrap();

        let loaded = load_state(&mut store, clock.now());
        assert!(!loaded.daily_reset);
        let restored = loaded.state;
        assert!(restored.current_session().is_none());
        assert!(!restored.is_in_focus_mode);
        assert!(restored.current_task_id.is_none());
        assert_eq!(restored.sessions.open_count(), 0);
        assert_eq!(restored.user_prefs.pomo_length, 50);
        let task = &restored.tasks.all()[0];
        assert!(task.is_mit);
        assert_eq!(task.subtasks.len(), 1);
        assert_eq!(task.subtasks[0].created_at, clock.now());
        assert_eq!(task.created_at, clock.now());
    }

    #[test]
    fn blob_uses_camel_case_keys() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        save_state(&mut store, &sample_state(&clock), clock.now()).unwrap();
        let json: serde_json::Value = serde_json::from_str(store.raw(STATE_KEY).unwrap()).unwrap();
        assert!(json.get("userPrefs").is_some());
        assert!(json.get("currentSession").is_some());
        assert_eq!(json["isInFocusMode"], true);
        assert_eq!(
            store.raw(LAST_ACTIVITY_KEY),
            Some(format_day_key(clock.today()).as_str())
        );
    }

    #[test]
    fn missing_or_corrupt_blob_gives_empty_state() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        let loaded = load_state(&mut store, clock.now());
        assert!(loaded.state.tasks.is_empty());

        store.set(STATE_KEY, "{not json").unwrap();
        let loaded = load_state(&mut store, clock.now());
        assert!(loaded.state.tasks.is_empty());
        assert_eq!(loaded.state.user_prefs, UserPrefs::default());
    }

    #[test]
    fn bad_fields_fall_back_individually() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        let blob = r#"{
            "tasks": [
                {"id": "a", "title": "ok", "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"},
                {"id": "b"}
            ],
            "sessions": "nope",
            "userPrefs": {"pomo_length": 40}
        }"#;
        store.set(STATE_KEY, blob).unwrap();
        let state = load_state(&mut store, clock.now()).state;
        assert_eq!(state.tasks.len(), 1);
        assert!(state.sessions.history().is_empty());
        assert_eq!(state.user_prefs.pomo_length, 40);
        assert_eq!(state.user_prefs.short_break_length, 5);
    }

    #[test]
    fn one_bad_task_field_keeps_the_task() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        let blob = r#"{
            "tasks": [{
                "id": "t1",
                "title": "keep me",
                "priority": "p1",
                "sort_order": 1.5,
                "is_mit": true,
                "tags": ["home"],
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-02T00:00:00Z"
            }]
        }"#;
        store.set(STATE_KEY, blob).unwrap();

        let state = load_state(&mut store, clock.now()).state;
        assert_eq!(state.tasks.len(), 1);
        let task = &state.tasks.all()[0];
        assert_eq!(task.title, "keep me");
        assert_eq!(task.priority, Priority::P2);
        assert_eq!(task.sort_order, None);
        assert!(task.is_mit);
        assert_eq!(task.tags, vec!["home".to_string()]);

        save_state(&mut store, &state, clock.now()).unwrap();
        assert!(store.raw(STATE_KEY).unwrap().contains("keep me"));
    }

    #[test]
    fn one_bad_pref_keeps_the_others() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        let blob = r#"{"userPrefs": {"pomo_length": 50, "short_break_length": 7, "auto_resume": "yes"}}"#;
        store.set(STATE_KEY, blob).unwrap();

        let prefs = load_state(&mut store, clock.now()).state.user_prefs;
        assert_eq!(prefs.pomo_length, 50);
        assert_eq!(prefs.short_break_length, 7);
        assert!(prefs.auto_resume);
        assert_eq!(prefs.long_break_length, 15);
    }

    #[test]
    fn new_day_triggers_reset_once() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        let mut state = sample_state(&clock);
        state.sessions.complete(None, false, clock.now());
        save_state(&mut store, &state, clock.now()).unwrap();

        clock.advance(Duration::days(1));
        let loaded = load_state(&mut store, clock.now());
        assert!(loaded.daily_reset);
        assert!(loaded.state.tasks.mit().is_none());
        assert_eq!(loaded.state.tasks.all()[0].updated_at, clock.now());

        let again = load_state(&mut store, clock.now());
        assert!(!again.daily_reset);
    }

    #[test]
    fn unrecognised_day_key_counts_as_new_day() {
        let clock = ManualClock::at_local_noon();
        let mut store = MemoryStore::new();
        save_state(&mut store, &sample_state(&clock), clock.now()).unwrap();
        store.set(LAST_ACTIVITY_KEY, "Mon Oct 19 2026").unwrap();
        assert!(load_state(&mut store, clock.now()).daily_reset);
    }

    #[test]
    fn database_backs_the_same_roundtrip() {
        let clock = ManualClock::at_local_noon();
        let mut db = Database::open_memory().unwrap();
        save_state(&mut db, &sample_state(&clock), clock.now()).unwrap();
        let loaded = load_state(&mut db, clock.now()).state;
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.sessions.history().len(), 1);
        db.remove(STATE_KEY).unwrap();
        assert!(db.get(STATE_KEY).unwrap().is_none());
    }
}
