//! Keyboard control binding for a running countdown.
//!
//! Translates discrete key presses into timer commands and the two
//! session-level actions (complete, cancel). The binding holds no timer state
//! of its own; hosts convert their native key events into [`Key`].
//!
//! | Key         | Action                       |
//! |-------------|------------------------------|
//! | Space       | start / pause / resume       |
//! | `r`         | reset                        |
//! | `+` / `=`   | extend by 1 minute           |
//! | `-`         | reduce by 1 minute           |
//! | `z`         | snooze                       |
//! | Enter       | complete the session         |
//! | Escape      | cancel the session           |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::Event;
use crate::timer::CountdownTimer;

/// Minutes added or removed by the extend/reduce keys.
pub const ADJUST_MINUTES: u32 = 1;

/// Default snooze length ("finish your thought").
pub const DEFAULT_SNOOZE_SECS: u64 = 60;

/// Timer operations the binding is allowed to drive.
pub trait TimerControls {
    fn start(&mut self) -> Option<Event>;
    fn pause(&mut self) -> Option<Event>;
    fn resume(&mut self) -> Option<Event>;
    fn stop(&mut self) -> Option<Event>;
    fn reset(&mut self) -> Option<Event>;
    fn extend(&mut self, minutes: u32) -> Option<Event>;
    fn reduce(&mut self, minutes: u32) -> Option<Event>;
    fn snooze(&mut self, seconds: u64) -> Option<Event>;
    fn is_running(&self) -> bool;
    fn is_paused(&self) -> bool;
}

impl TimerControls for CountdownTimer {
    fn start(&mut self) -> Option<Event> {
        CountdownTimer::start(self)
    }
    fn pause(&mut self) -> Option<Event> {
        CountdownTimer::pause(self)
    }
    fn resume(&mut self) -> Option<Event> {
        CountdownTimer::resume(self)
    }
    fn stop(&mut self) -> Option<Event> {
        CountdownTimer::stop(self)
    }
    fn reset(&mut self) -> Option<Event> {
        CountdownTimer::reset(self, None)
    }
    fn extend(&mut self, minutes: u32) -> Option<Event> {
        CountdownTimer::extend(self, minutes)
    }
    fn reduce(&mut self, minutes: u32) -> Option<Event> {
        CountdownTimer::reduce(self, minutes)
    }
    fn snooze(&mut self, seconds: u64) -> Option<Event> {
        CountdownTimer::snooze(self, seconds)
    }
    fn is_running(&self) -> bool {
        CountdownTimer::is_running(self)
    }
    fn is_paused(&self) -> bool {
        CountdownTimer::is_paused(self)
    }
}

/// Host-independent key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    Escape,
    Char(char),
    Other,
}

/// Where keyboard focus currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFocus {
    #[default]
    Global,
    /// A text field owns the keyboard; shortcuts must not fire.
    TextInput,
}

/// What a key press ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommand {
    Start,
    Pause,
    Resume,
    Reset,
    Extend,
    Reduce,
    Snooze,
    Complete,
    Cancel,
}

type Callback = Box<dyn FnMut()>;

pub struct KeyboardBinding {
    on_complete: Option<Callback>,
    on_cancel: Option<Callback>,
    snooze_secs: u64,
    bound: bool,
}

impl KeyboardBinding {
    pub fn new<C, X>(on_complete: C, on_cancel: X) -> Self
    where
        C: FnMut() + 'static,
        X: FnMut() + 'static,
    {
        Self {
            on_complete: Some(Box::new(on_complete)),
            on_cancel: Some(Box::new(on_cancel)),
            snooze_secs: DEFAULT_SNOOZE_SECS,
            bound: true,
        }
    }

    pub fn with_snooze_secs(mut self, secs: u64) -> Self {
        self.snooze_secs = secs;
        self
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Release both callbacks. Every later key is ignored.
    pub fn unbind(&mut self) {
        self.bound = false;
        self.on_complete = None;
        self.on_cancel = None;
    }

    /// Dispatch one key press. Returns the command that was mapped, whether
    /// or not the timer accepted it, except Space on a finished countdown,
    /// which maps to nothing.
    pub fn handle_key(
        &mut self,
        key: Key,
        focus: InputFocus,
        controls: &mut dyn TimerControls,
    ) -> Option<KeyCommand> {
        if !self.bound || focus == InputFocus::TextInput {
            return None;
        }
        let command = match key {
            Key::Space => {
                if controls.is_running() {
                    controls.pause();
                    KeyCommand::Pause
                } else if controls.is_paused() {
                    controls.resume();
                    KeyCommand::Resume
                } else {
                    controls.start()?;
                    KeyCommand::Start
                }
            }
            Key::Char('r') | Key::Char('R') => {
                controls.reset();
                KeyCommand::Reset
            }
            Key::Char('+') | Key::Char('=') => {
                controls.extend(ADJUST_MINUTES);
                KeyCommand::Extend
            }
            Key::Char('-') => {
                controls.reduce(ADJUST_MINUTES);
                KeyCommand::Reduce
            }
            Key::Char('z') | Key::Char('Z') => {
                controls.snooze(self.snooze_secs);
                KeyCommand::Snooze
            }
            Key::Enter => {
                if let Some(callback) = self.on_complete.as_mut() {
                    callback();
                }
                KeyCommand::Complete
            }
            Key::Escape => {
                if let Some(callback) = self.on_cancel.as_mut() {
                    callback();
                }
                KeyCommand::Cancel
            }
            _ => return None,
        };
        tracing::trace!(?key, ?command, "key handled");
        Some(command)
    }

    /// Help text for the mapping, in display order.
    pub fn shortcuts() -> &'static [(&'static str, &'static str)] {
        &[
            ("Space", "Start/Pause/Resume timer"),
            ("R", "Reset timer"),
            ("+", "Extend timer (+1 min)"),
            ("-", "Reduce timer (-1 min)"),
            ("Z", "Snooze"),
            ("Enter", "Complete session"),
            ("Esc", "Cancel session"),
        ]
    }
}

impl fmt::Debug for KeyboardBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardBinding")
            .field("bound", &self.bound)
            .field("snooze_secs", &self.snooze_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn binding() -> (KeyboardBinding, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let completes = Rc::new(Cell::new(0));
        let cancels = Rc::new(Cell::new(0));
        let (c, x) = (Rc::clone(&completes), Rc::clone(&cancels));
        let binding = KeyboardBinding::new(
            move || c.set(c.get() + 1),
            move || x.set(x.get() + 1),
        );
        (binding, completes, cancels)
    }

    #[test]
    fn space_cycles_start_pause_resume() {
        let (mut keys, _, _) = binding();
        let mut timer = CountdownTimer::new(25);

        assert_eq!(keys.handle_key(Key::Space, InputFocus::Global, &mut timer), Some(KeyCommand::Start));
        assert!(timer.is_running());
        assert_eq!(keys.handle_key(Key::Space, InputFocus::Global, &mut timer), Some(KeyCommand::Pause));
        assert!(timer.is_paused());
        assert_eq!(keys.handle_key(Key::Space, InputFocus::Global, &mut timer), Some(KeyCommand::Resume));
        assert!(timer.is_running());
    }

    #[test]
    fn space_on_a_finished_countdown_maps_to_nothing() {
        let (mut keys, _, _) = binding();
        let mut timer = CountdownTimer::new(1);
        timer.start();
        timer.reduce(1);
        assert!(timer.is_completed());

        assert_eq!(keys.handle_key(Key::Space, InputFocus::Global, &mut timer), None);
        assert!(timer.is_completed());
        assert_eq!(keys.handle_key(Key::Char('r'), InputFocus::Global, &mut timer), Some(KeyCommand::Reset));
        assert_eq!(keys.handle_key(Key::Space, InputFocus::Global, &mut timer), Some(KeyCommand::Start));
    }

    #[test]
    fn adjust_keys_change_timer_by_one_minute() {
        let (mut keys, _, _) = binding();
        let mut timer = CountdownTimer::new(25);
        timer.start();

        keys.handle_key(Key::Char('+'), InputFocus::Global, &mut timer);
        assert_eq!(timer.total_secs(), 26 * 60);
        keys.handle_key(Key::Char('-'), InputFocus::Global, &mut timer);
        assert_eq!(timer.total_secs(), 25 * 60);
        keys.handle_key(Key::Char('z'), InputFocus::Global, &mut timer);
        assert_eq!(timer.remaining_secs(), 25 * 60 + DEFAULT_SNOOZE_SECS);
        keys.handle_key(Key::Char('r'), InputFocus::Global, &mut timer);
        assert_eq!(timer.remaining_secs(), 25 * 60);
        assert!(!timer.is_running());
    }

    #[test]
    fn enter_and_escape_invoke_callbacks() {
        let (mut keys, completes, cancels) = binding();
        let mut timer = CountdownTimer::new(25);
        keys.handle_key(Key::Enter, InputFocus::Global, &mut timer);
        keys.handle_key(Key::Escape, InputFocus::Global, &mut timer);
        keys.handle_key(Key::Escape, InputFocus::Global, &mut timer);
        assert_eq!(completes.get(), 1);
        assert_eq!(cancels.get(), 2);
    }

    #[test]
    fn text_input_focus_suppresses_shortcuts() {
        let (mut keys, completes, _) = binding();
        let mut timer = CountdownTimer::new(25);
        assert!(keys.handle_key(Key::Space, InputFocus::TextInput, &mut timer).is_none());
        assert!(keys.handle_key(Key::Enter, InputFocus::TextInput, &mut timer).is_none());
        assert!(!timer.is_running());
        assert_eq!(completes.get(), 0);
    }

    #[test]
    fn unbind_releases_callbacks() {
        let (mut keys, completes, _) = binding();
        let mut timer = CountdownTimer::new(25);
        keys.unbind();
        assert!(!keys.is_bound());
        assert!(keys.handle_key(Key::Enter, InputFocus::Global, &mut timer).is_none());
        assert!(keys.handle_key(Key::Space, InputFocus::Global, &mut timer).is_none());
        assert_eq!(completes.get(), 0);
        assert_eq!(Rc::strong_count(&completes), 1);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let (mut keys, _, _) = binding();
        let mut timer = CountdownTimer::new(25);
        assert!(keys.handle_key(Key::Char('q'), InputFocus::Global, &mut timer).is_none());
        assert!(keys.handle_key(Key::Other, InputFocus::Global, &mut timer).is_none());
    }
}
