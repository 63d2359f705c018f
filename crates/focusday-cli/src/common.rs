//! Shared setup for commands: logging, opening the app, id lookup.

use std::io::Write;

use focusday_core::{Config, Database, FocusApp, Notifier, SessionType, SystemClock};
use tracing_subscriber::EnvFilter;

pub type App = FocusApp<Database, SystemClock>;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// `FOCUSDAY_LOG` wins over the configured level. Logs go to stderr so
/// stdout stays clean for JSON output.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("FOCUSDAY_LOG").unwrap_or_else(|_| {
        let level = Config::load_or_default().log.level;
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Open the app on the configured database.
pub fn open_app() -> Result<App, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db_path = config.db_path()?;
    tracing::debug!(path = %db_path.display(), "opening database");
    let db = Database::open_at(&db_path)?;
    let app = FocusApp::load(db, SystemClock).with_grace_secs(config.timer.grace_secs);
    let notifier = TerminalNotifier {
        sound: app.prefs().sound_enabled,
    };
    Ok(app.with_notifier(Box::new(notifier)))
}

/// Resolve a full id or a unique id prefix.
pub fn resolve_task_id(app: &App, needle: &str) -> Result<String, String> {
    if app.task(needle).is_some() {
        return Ok(needle.to_string());
    }
    let matches: Vec<&str> = app
        .state()
        .tasks
        .all()
        .iter()
        .filter(|t| t.id.starts_with(needle))
        .map(|t| t.id.as_str())
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => Err(format!("Task not found: {needle}")),
        _ => Err(format!("Ambiguous task id prefix: {needle}")),
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Prints completions to the terminal; rings the bell when sound is on.
pub struct TerminalNotifier {
    sound: bool,
}

impl Notifier for TerminalNotifier {
    fn session_completed(&self, session_type: SessionType, task_title: Option<&str>) {
        let mut out = std::io::stdout();
        let line = match (session_type, task_title) {
            (SessionType::Focus, Some(title)) => format!("Focus session complete: {title}"),
            (SessionType::Focus, None) => "Focus session complete".to_string(),
            (_, _) => format!("{} over, back to work", session_type.label()),
        };
        if self.sound {
            let _ = write!(out, "\x07");
        }
        let _ = write!(out, "{line}\r\n");
        let _ = out.flush();
    }
}
