mod config;
pub mod database;
pub mod persist;

pub use config::{Config, LogConfig, StorageConfig, TimerConfig};
pub use database::Database;
pub use persist::{load_state, save_state, KeyValueStore, LoadOutcome, MemoryStore, LAST_ACTIVITY_KEY, STATE_KEY};

pub(crate) use config::{get_json_value_by_path, set_json_value_by_path};

use std::path::PathBuf;

use crate::error::Result;

/// Environment variable selecting the data directory flavour.
pub const ENV_VAR: &str = "FOCUSDAY_ENV";

/// Returns `~/.config/focusday[-dev]/` based on FOCUSDAY_ENV.
///
/// Set FOCUSDAY_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusday-dev")
    } else {
        base_dir.join("focusday")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
