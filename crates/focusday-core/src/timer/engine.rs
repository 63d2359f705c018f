//! Countdown timer implementation.
//!
//! The countdown is a tick-driven state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` once per second.
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Running <-> Paused
//!            |           |
//!            v           |
//!        Completed       |
//!            |           |
//!  stop() ---+-----------+--> Ready
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = CountdownTimer::new(25);
//! timer.on_complete(|done| println!("finished after {}s", done.total_secs));
//! timer.start();
//! // Once per second:
//! timer.tick(); // Returns Some(Event::TimerCompleted) on the final second
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Ready,
    Running,
    Paused,
    Completed,
}

/// Passed to the completion observer when a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub total_secs: u64,
    /// Whether `extend` was used during the run.
    pub extended: bool,
}

type CompletionObserver = Box<dyn FnMut(&Completion)>;

/// Second-granularity countdown.
///
/// Completion is reported twice over, as the `Event::TimerCompleted` returned
/// by the call that finished the run and through the registered observer.
/// Both happen exactly once per run; `stop` and `reset` re-arm them.
pub struct CountdownTimer {
    initial_minutes: u32,
    state: TimerState,
    total_secs: u64,
    remaining_secs: u64,
    extended: bool,
    fired: bool,
    on_complete: Option<CompletionObserver>,
}

impl CountdownTimer {
    /// Create a timer in the `Ready` state.
    pub fn new(minutes: u32) -> Self {
        let total_secs = minutes_to_secs(minutes);
        Self {
            initial_minutes: minutes,
            state: TimerState::Ready,
            total_secs,
            remaining_secs: total_secs,
            extended: false,
            fired: false,
            on_complete: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.state == TimerState::Completed
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    /// Whole minutes of the remaining time, for `MM:SS` display.
    pub fn minutes(&self) -> u64 {
        self.remaining_secs / 60
    }

    /// Seconds part of the remaining time, for `MM:SS` display.
    pub fn seconds(&self) -> u64 {
        self.remaining_secs % 60
    }

    pub fn was_extended(&self) -> bool {
        self.extended
    }

    /// 0.0 .. 1.0 fraction of the total that has elapsed.
    ///
    /// Snoozing can push remaining above the total; the result is clamped.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        let elapsed = self.total_secs as f64 - self.remaining_secs as f64;
        (elapsed / self.total_secs as f64).clamp(0.0, 1.0)
    }

    /// Register the completion observer, replacing any previous one.
    pub fn on_complete<F>(&mut self, observer: F)
    where
        F: FnMut(&Completion) + 'static,
    {
        self.on_complete = Some(Box::new(observer));
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Ready => {
                if self.remaining_secs == 0 {
                    return Some(self.complete());
                }
                self.state = TimerState::Running;
                tracing::debug!(total_secs = self.total_secs, "countdown started");
                Some(Event::TimerStarted {
                    total_secs: self.total_secs,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            TimerState::Paused => self.resume(),
            TimerState::Running | TimerState::Completed => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Paused;
        tracing::debug!(remaining_secs = self.remaining_secs, "countdown paused");
        Some(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.state != TimerState::Paused {
            return None;
        }
        self.state = TimerState::Running;
        tracing::debug!(remaining_secs = self.remaining_secs, "countdown resumed");
        Some(Event::TimerResumed {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Abandon the run. Remaining goes back to the (possibly extended) total.
    pub fn stop(&mut self) -> Option<Event> {
        if self.state == TimerState::Ready {
            return None;
        }
        self.state = TimerState::Ready;
        self.remaining_secs = self.total_secs;
        self.extended = false;
        self.fired = false;
        tracing::debug!("countdown stopped");
        Some(Event::TimerStopped { at: Utc::now() })
    }

    /// Back to `Ready` with a fresh total. `None` or `Some(0)` reuses the
    /// duration the timer was built with.
    pub fn reset(&mut self, new_minutes: Option<u32>) -> Option<Event> {
        let minutes = new_minutes
            .filter(|m| *m > 0)
            .unwrap_or(self.initial_minutes);
        self.state = TimerState::Ready;
        self.total_secs = minutes_to_secs(minutes);
        self.remaining_secs = self.total_secs;
        self.extended = false;
        self.fired = false;
        Some(Event::TimerReset {
            total_secs: self.total_secs,
            at: Utc::now(),
        })
    }

    /// Add minutes to both the total and the remaining time.
    pub fn extend(&mut self, minutes: u32) -> Option<Event> {
        if !self.is_live() || minutes == 0 {
            return None;
        }
        let added = minutes_to_secs(minutes);
        self.total_secs = self.total_secs.saturating_add(added);
        self.remaining_secs = self.remaining_secs.saturating_add(added);
        self.extended = true;
        tracing::debug!(added_secs = added, total_secs = self.total_secs, "countdown extended");
        Some(Event::TimerExtended {
            added_secs: added,
            total_secs: self.total_secs,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Take minutes off the remaining time (and the total, so elapsed time is
    /// kept). Hitting zero completes the run on the spot.
    pub fn reduce(&mut self, minutes: u32) -> Option<Event> {
        if !self.is_live() || minutes == 0 {
            return None;
        }
        let removed = minutes_to_secs(minutes).min(self.remaining_secs);
        self.remaining_secs -= removed;
        self.total_secs -= removed;
        tracing::debug!(removed_secs = removed, remaining_secs = self.remaining_secs, "countdown reduced");
        if self.remaining_secs == 0 {
            return Some(self.complete());
        }
        Some(Event::TimerReduced {
            removed_secs: removed,
            total_secs: self.total_secs,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Push the deadline back without touching the planned total.
    pub fn snooze(&mut self, seconds: u64) -> Option<Event> {
        if !self.is_live() || seconds == 0 {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_add(seconds);
        tracing::debug!(added_secs = seconds, "countdown snoozed");
        Some(Event::TimerSnoozed {
            added_secs: seconds,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Call once per second. Returns `Some(Event::TimerCompleted)` on the
    /// tick that reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return Some(self.complete());
        }
        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_live(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Paused)
    }

    fn complete(&mut self) -> Event {
        self.state = TimerState::Completed;
        self.remaining_secs = 0;
        let completion = Completion {
            total_secs: self.total_secs,
            extended: self.extended,
        };
        if !self.fired {
            self.fired = true;
            tracing::debug!(total_secs = self.total_secs, "countdown completed");
            if let Some(observer) = self.on_complete.as_mut() {
                observer(&completion);
            }
        }
        Event::TimerCompleted {
            total_secs: completion.total_secs,
            extended: completion.extended,
            at: Utc::now(),
        }
    }
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("initial_minutes", &self.initial_minutes)
            .field("state", &self.state)
            .field("total_secs", &self.total_secs)
            .field("remaining_secs", &self.remaining_secs)
            .field("extended", &self.extended)
            .field("has_observer", &self.on_complete.is_some())
            .finish()
    }
}

fn minutes_to_secs(minutes: u32) -> u64 {
    u64::from(minutes).saturating_mul(60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_timer(minutes: u32) -> (CountdownTimer, Rc<Cell<u32>>) {
        let fired = Rc::new(Cell::new(0));
        let mut timer = CountdownTimer::new(minutes);
        let hits = Rc::clone(&fired);
        timer.on_complete(move |_| hits.set(hits.get() + 1));
        (timer, fired)
    }

    #[test]
    fn start_pause_resume() {
        let mut timer = CountdownTimer::new(25);
        assert_eq!(timer.state(), TimerState::Ready);

        assert!(timer.start().is_some());
        assert!(timer.is_running());

        assert!(timer.pause().is_some());
        assert!(timer.is_paused());

        assert!(timer.resume().is_some());
        assert!(timer.is_running());
    }

    #[test]
    fn resume_when_not_paused_is_noop() {
        let mut timer = CountdownTimer::new(25);
        assert!(timer.resume().is_none());
        assert_eq!(timer.state(), TimerState::Ready);

        timer.start();
        timer.tick();
        let remaining = timer.remaining_secs();
        assert!(timer.resume().is_none());
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.remaining_secs(), remaining);
    }

    #[test]
    fn tick_decrements_one_second_only_while_running() {
        let mut timer = CountdownTimer::new(1);
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_secs(), 60);

        timer.start();
        timer.tick();
        timer.tick();
        assert_eq!(timer.remaining_secs(), 58);

        timer.pause();
        timer.tick();
        assert_eq!(timer.remaining_secs(), 58);
    }

    #[test]
    fn extend_while_running_grows_total_and_remaining() {
        let mut timer = CountdownTimer::new(25);
        timer.start();
        for _ in 0..300 {
            timer.tick();
        }
        let before = timer.remaining_secs();

        assert!(timer.extend(1).is_some());
        assert_eq!(timer.total_secs(), 26 * 60);
        assert_eq!(timer.remaining_secs(), before + 60);
        assert!((timer.progress() - 300.0 / 1560.0).abs() < 1e-9);
        assert!(timer.was_extended());
    }

    #[test]
    fn adjustments_are_noops_when_ready_or_completed() {
        let mut timer = CountdownTimer::new(1);
        assert!(timer.extend(1).is_none());
        assert!(timer.reduce(1).is_none());
        assert!(timer.snooze(30).is_none());
        assert_eq!(timer.total_secs(), 60);

        timer.start();
        for _ in 0..60 {
            timer.tick();
        }
        assert!(timer.is_completed());
        assert!(timer.extend(1).is_none());
        assert!(timer.snooze(30).is_none());
        assert_eq!(timer.remaining_secs(), 0);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let (mut timer, fired) = counting_timer(1);
        timer.start();
        let mut completed_events = 0;
        for _ in 0..120 {
            if let Some(Event::TimerCompleted { .. }) = timer.tick() {
                completed_events += 1;
            }
        }
        assert_eq!(completed_events, 1);
        assert_eq!(fired.get(), 1);
        assert!(!timer.is_running());
        assert!((timer.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reduce_past_zero_completes_immediately() {
        let (mut timer, fired) = counting_timer(2);
        timer.start();
        timer.tick();
        let event = timer.reduce(5);
        assert!(matches!(event, Some(Event::TimerCompleted { .. })));
        assert!(timer.is_completed());
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn reduce_keeps_elapsed_time() {
        let mut timer = CountdownTimer::new(10);
        timer.start();
        for _ in 0..60 {
            timer.tick();
        }
        timer.reduce(2);
        assert_eq!(timer.remaining_secs(), 9 * 60 - 120);
        assert_eq!(timer.total_secs() - timer.remaining_secs(), 60);
    }

    #[test]
    fn snooze_moves_deadline_but_not_total() {
        let mut timer = CountdownTimer::new(1);
        timer.start();
        timer.tick();
        timer.snooze(30);
        assert_eq!(timer.total_secs(), 60);
        assert_eq!(timer.remaining_secs(), 89);
        assert_eq!(timer.progress(), 0.0);
    }

    #[test]
    fn stop_discards_progress() {
        let mut timer = CountdownTimer::new(5);
        timer.start();
        for _ in 0..10 {
            timer.tick();
        }
        assert!(timer.stop().is_some());
        assert_eq!(timer.state(), TimerState::Ready);
        assert_eq!(timer.remaining_secs(), 300);
        assert!(timer.stop().is_none());
    }

    #[test]
    fn reset_rearms_completion() {
        let (mut timer, fired) = counting_timer(1);
        timer.start();
        timer.reduce(1);
        assert_eq!(fired.get(), 1);

        timer.reset(Some(2));
        assert_eq!(timer.total_secs(), 120);
        assert_eq!(timer.state(), TimerState::Ready);
        timer.start();
        timer.reduce(2);
        assert_eq!(fired.get(), 2);

        timer.reset(None);
        assert_eq!(timer.total_secs(), 60);
    }

    #[test]
    fn start_from_paused_resumes() {
        let mut timer = CountdownTimer::new(1);
        timer.start();
        timer.pause();
        assert!(matches!(timer.start(), Some(Event::TimerResumed { .. })));
        assert!(timer.is_running());
    }

    #[test]
    fn display_split() {
        let mut timer = CountdownTimer::new(25);
        timer.start();
        for _ in 0..5 {
            timer.tick();
        }
        assert_eq!((timer.minutes(), timer.seconds()), (24, 55));
    }
}
