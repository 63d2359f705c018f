//! User preferences read by the session, break and sequencing logic.
//!
//! Preferences live inside the persisted application state rather than the
//! TOML config file: they travel with the tasks and sessions they shape.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::SessionType;
use crate::storage::{get_json_value_by_path, set_json_value_by_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default = "default_pomo_length")]
    pub pomo_length: u32,
    #[serde(default = "default_short_break")]
    pub short_break_length: u32,
    #[serde(default = "default_long_break")]
    pub long_break_length: u32,
    #[serde(default = "default_cycles")]
    pub cycles_to_long_break: u32,
    #[serde(default = "default_true")]
    pub auto_resume: bool,
    #[serde(default)]
    pub dnd_enabled: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub adaptive_breaks: bool,
    #[serde(default = "default_min_break")]
    pub min_break_length: u32,
    #[serde(default = "default_max_break")]
    pub max_break_length: u32,
}

fn default_pomo_length() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_cycles() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_min_break() -> u32 {
    3
}
fn default_max_break() -> u32 {
    10
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            pomo_length: default_pomo_length(),
            short_break_length: default_short_break(),
            long_break_length: default_long_break(),
            cycles_to_long_break: default_cycles(),
            auto_resume: true,
            dnd_enabled: false,
            sound_enabled: true,
            adaptive_breaks: true,
            min_break_length: default_min_break(),
            max_break_length: default_max_break(),
        }
    }
}

impl UserPrefs {
    /// Configured length in minutes for a session type.
    pub fn length_for(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Focus => self.pomo_length,
            SessionType::ShortBreak => self.short_break_length,
            SessionType::LongBreak => self.long_break_length,
        }
    }

    /// Cycle length used for long-break placement; a zero setting acts as 1.
    pub fn cycles(&self) -> u32 {
        self.cycles_to_long_break.max(1)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set one preference by key, type-checked against its current value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_pomodoro() {
        let prefs = UserPrefs::default();
        assert_eq!(prefs.length_for(SessionType::Focus), 25);
        assert_eq!(prefs.length_for(SessionType::ShortBreak), 5);
        assert_eq!(prefs.length_for(SessionType::LongBreak), 15);
        assert_eq!(prefs.cycles(), 4);
        assert_eq!((prefs.min_break_length, prefs.max_break_length), (3, 10));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let prefs: UserPrefs = serde_json::from_str(r#"{"pomo_length": 50}"#).unwrap();
        assert_eq!(prefs.pomo_length, 50);
        assert_eq!(prefs.short_break_length, 5);
        assert!(prefs.adaptive_breaks);
    }

    #[test]
    fn set_by_key_is_type_checked() {
        let mut prefs = UserPrefs::default();
        prefs.set("pomo_length", "30").unwrap();
        prefs.set("auto_resume", "false").unwrap();
        assert_eq!(prefs.get("pomo_length").as_deref(), Some("30"));
        assert!(!prefs.auto_resume);
        assert!(prefs.set("auto_resume", "maybe").is_err());
        assert!(prefs.set("theme", "dark").is_err());
    }

    #[test]
    fn zero_cycles_acts_as_one() {
        let prefs = UserPrefs {
            cycles_to_long_break: 0,
            ..UserPrefs::default()
        };
        assert_eq!(prefs.cycles(), 1);
    }
}
