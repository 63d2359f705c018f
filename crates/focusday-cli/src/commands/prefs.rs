use clap::Subcommand;
use focusday_core::UserPrefs;

use crate::common::{open_app, CmdResult};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Get a preference
    Get {
        /// Preference name (e.g. "pomo_length", "auto_resume")
        key: String,
    },
    /// Set a preference
    Set {
        /// Preference name
        key: String,
        /// New value, checked against the preference's type
        value: String,
    },
    /// List all preferences
    List,
    /// Restore default preferences
    Reset,
}

pub fn run(action: PrefsAction) -> CmdResult {
    let mut app = open_app()?;

    match action {
        PrefsAction::Get { key } => match app.prefs().get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown preference: {key}").into()),
        },
        PrefsAction::Set { key, value } => {
            app.set_pref(&key, &value)?;
            println!("{key} = {}", app.prefs().get(&key).unwrap_or(value));
        }
        PrefsAction::List => {
            println!("{}", serde_json::to_string_pretty(app.prefs())?);
        }
        PrefsAction::Reset => {
            app.update_prefs(UserPrefs::default());
            println!("preferences reset to defaults");
        }
    }
    Ok(())
}
