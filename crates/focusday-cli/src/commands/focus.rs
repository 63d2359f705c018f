//! Interactive focus sessions in the terminal.
//!
//! The loop polls the keyboard with a one second budget and ticks the app
//! once per elapsed second. Sessions chain through the auto-resume
//! countdown until the user quits.

use std::cell::Cell;
use std::io::{self, Stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Subcommand;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute, style::Print};
use focusday_core::{
    BreakType, CompletionRequest, Config, InputFocus, Key, KeyboardBinding, NextStep, SessionType,
};

use crate::common::{open_app, resolve_task_id, App, CmdResult};

#[derive(Subcommand)]
pub enum FocusAction {
    /// Start a session and run it in this terminal
    Start {
        /// Task ID or unique prefix; defaults to today's MIT
        #[arg(long)]
        task: Option<String>,
        /// Do not attach the MIT when no task is given
        #[arg(long, conflicts_with = "task")]
        no_task: bool,
        /// focus, short or long
        #[arg(long = "type", default_value = "focus")]
        session_type: SessionType,
        /// Planned minutes instead of the configured length
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Print the keyboard shortcuts
    Keys,
}

/// Extra keys handled by the loop itself, on top of the timer bindings.
const LOOP_KEYS: &[(&str, &str)] = &[
    ("D", "Complete session and mark the task done"),
    ("N", "Complete and start another pomodoro"),
    ("S", "Start the suggested session when idle"),
    ("Q", "Quit (an open session is interrupted)"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Complete,
    Cancel,
}

enum Flow {
    Continue,
    Quit,
}

/// Raw mode for the lifetime of the guard.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub fn run(action: FocusAction) -> CmdResult {
    match action {
        FocusAction::Keys => {
            for (key, help) in KeyboardBinding::shortcuts().iter().chain(LOOP_KEYS) {
                println!("{key:<6} {help}");
            }
            Ok(())
        }
        FocusAction::Start {
            task,
            no_task,
            session_type,
            minutes,
        } => {
            let config = Config::load_or_default();
            let mut app = open_app()?;
            let task_id = match task {
                Some(needle) => Some(resolve_task_id(&app, &needle)?),
                None if !no_task && session_type == SessionType::Focus => {
                    app.mit().map(|t| t.id.clone())
                }
                None => None,
            };
            start(&mut app, session_type, task_id.as_deref(), minutes);
            run_loop(&mut app, config.timer.snooze_secs)
        }
    }
}

/// Breaks without an explicit length get the adaptive one.
fn start(app: &mut App, session_type: SessionType, task_id: Option<&str>, minutes: Option<u32>) {
    let minutes = minutes.or_else(|| {
        BreakType::try_from(session_type)
            .ok()
            .map(|b| app.calculate_adaptive_break_duration(b))
    });
    app.start_session(session_type, task_id, minutes);
}

fn run_loop(app: &mut App, snooze_secs: u64) -> CmdResult {
    let signal: Rc<Cell<Option<Signal>>> = Rc::new(Cell::new(None));
    let (on_complete, on_cancel) = (signal.clone(), signal.clone());
    let mut binding = KeyboardBinding::new(
        move || on_complete.set(Some(Signal::Complete)),
        move || on_cancel.set(Some(Signal::Cancel)),
    )
    .with_snooze_secs(snooze_secs);

    let _raw = RawMode::enable()?;
    let mut out = io::stdout();
    let second = Duration::from_secs(1);
    let mut last_tick = Instant::now();
    let mut last_task = app.current_session().and_then(|s| s.task_id.clone());

    loop {
        render(&mut out, app)?;

        let timeout = second.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let TermEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let flow = handle_key(app, &mut binding, &signal, key, &mut last_task, &mut out)?;
                    if let Flow::Quit = flow {
                        break;
                    }
                }
            }
        }

        if last_tick.elapsed() >= second {
            last_tick = Instant::now();
            let outcome = app.tick();
            if let Some(session) = outcome.started {
                if session.task_id.is_some() {
                    last_task = session.task_id.clone();
                }
                say(&mut out, &format!("{} started", session.session_type.label()))?;
            }
            if outcome.timer_completed {
                finish(app, CompletionRequest::default(), &mut out)?;
            }
        }
        if app.take_timer_completion() {
            finish(app, CompletionRequest::default(), &mut out)?;
        }
    }

    binding.unbind();
    execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    Ok(())
}

fn handle_key(
    app: &mut App,
    binding: &mut KeyboardBinding,
    signal: &Rc<Cell<Option<Signal>>>,
    key: KeyEvent,
    last_task: &mut Option<String>,
    out: &mut Stdout,
) -> io::Result<Flow> {
    let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
    if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
        if let Some(interrupted) = app.exit_focus() {
            say(out, &format!("{} interrupted", interrupted.session_type.label()))?;
        }
        app.cancel_auto_resume();
        return Ok(Flow::Quit);
    }

    if app.sequencer().is_counting_down() {
        match key.code {
            KeyCode::Enter => {
                if let Some(session) = app.start_pending_now() {
                    if session.task_id.is_some() {
                        *last_task = session.task_id.clone();
                    }
                    say(out, &format!("{} started", session.session_type.label()))?;
                }
            }
            KeyCode::Esc => {
                app.cancel_auto_resume();
                say(out, "Auto-start cancelled")?;
            }
            _ => {}
        }
        return Ok(Flow::Continue);
    }

    let Some(open) = app.current_session().map(|s| s.session_type) else {
        if matches!(key.code, KeyCode::Char('s') | KeyCode::Char('S')) {
            let next = app.sequencer().pending_type();
            let task = if next == SessionType::Focus {
                last_task.clone()
            } else {
                None
            };
            start(app, next, task.as_deref(), None);
            say(out, &format!("{} started", next.label()))?;
        }
        return Ok(Flow::Continue);
    };

    match key.code {
        KeyCode::Char('d') | KeyCode::Char('D') if open == SessionType::Focus => {
            let request = CompletionRequest {
                complete_task: true,
                ..CompletionRequest::default()
            };
            finish(app, request, out)?;
        }
        KeyCode::Char('n') | KeyCode::Char('N') if open == SessionType::Focus => {
            let request = CompletionRequest {
                continue_session: true,
                ..CompletionRequest::default()
            };
            finish(app, request, out)?;
        }
        code => {
            binding.handle_key(to_key(code), InputFocus::Global, app.timer_mut());
            match signal.take() {
                Some(Signal::Complete) => finish(app, CompletionRequest::default(), out)?,
                Some(Signal::Cancel) => {
                    app.exit_focus();
                    say(out, "Session cancelled")?;
                }
                None => {}
            }
        }
    }
    Ok(Flow::Continue)
}

fn finish(app: &mut App, request: CompletionRequest, out: &mut Stdout) -> io::Result<()> {
    let Some(outcome) = app.handle_session_complete(request) else {
        return Ok(());
    };
    tracing::debug!(next = ?outcome.next, "session finished");
    let session = &outcome.session;
    say(
        out,
        &format!(
            "{} done: {:.1} of {} min",
            session.session_type.label(),
            session.duration,
            session.planned_duration
        ),
    )?;
    match outcome.next {
        NextStep::Continued(next) => say(out, &format!("{} started", next.session_type.label())),
        NextStep::Countdown(pending) => say(
            out,
            &format!(
                "{} starts in {}s (Enter: now, Esc: cancel)",
                pending.session_type.label(),
                app.sequencer().grace_secs()
            ),
        ),
        NextStep::Manual(next) => say(out, &format!("Next: {} (press s to start)", next.label())),
    }
}

fn status_line(app: &App) -> String {
    if let Some(remaining) = app.sequencer().grace_remaining() {
        return format!("{} in {remaining}s", app.sequencer().pending_type().label());
    }
    let Some(session) = app.current_session() else {
        return format!(
            "Idle. s: start {}, q: quit",
            app.sequencer().pending_type().label()
        );
    };
    let timer = app.timer();
    let state = if timer.is_paused() {
        "paused"
    } else if timer.is_completed() {
        "done"
    } else if timer.is_running() {
        "running"
    } else {
        "stopped"
    };
    let task = app.current_task().map(|t| t.title.as_str()).unwrap_or("");
    format!(
        "{}  {:02}:{:02}  {:>3.0}%  [{state}]  {task}",
        session.session_type.label(),
        timer.minutes(),
        timer.seconds(),
        timer.progress() * 100.0
    )
}

fn render(out: &mut Stdout, app: &App) -> io::Result<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(status_line(app))
    )?;
    out.flush()
}

/// Print a message on its own line below the status line.
fn say(out: &mut Stdout, message: &str) -> io::Result<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )
}

fn to_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        _ => Key::Other,
    }
}
