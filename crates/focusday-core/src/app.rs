//! The application object.
//!
//! [`FocusApp`] owns the state and is the only way to change it. Every
//! operation restores the invariants (one MIT, one open session) before it
//! returns and then persists. Persistence failures are logged and swallowed;
//! the in-memory state stays authoritative.

use chrono::{DateTime, Utc};

use crate::breaks::{self, BreakType};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, ValidationError};
use crate::events::Event;
use crate::notify::{NoopNotifier, Notifier};
use crate::prefs::UserPrefs;
use crate::sequencer::{AutoResumeSequencer, PendingSession};
use crate::session::{Session, SessionType, INTERRUPTED_NOTE};
use crate::state::AppState;
use crate::storage::{load_state, save_state, KeyValueStore};
use crate::task::{Subtask, SubtaskPatch, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::timer::CountdownTimer;

/// Inputs gathered when the user closes a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub notes: Option<String>,
    /// Also mark the session's task completed.
    pub complete_task: bool,
    /// Skip the break and start another focus session on the same task.
    pub continue_session: bool,
    /// Subtask to append to the session's task.
    pub new_subtask_title: Option<String>,
    pub was_extended: bool,
}

/// What follows a completed session.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// Another focus session was opened immediately.
    Continued(Session),
    /// A grace countdown is running toward this session.
    Countdown(PendingSession),
    /// Nothing starts on its own; this is the suggested next type.
    Manual(SessionType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub session: Session,
    pub next: NextStep,
}

/// What a one-second tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// The countdown of the open session reached zero on this tick.
    pub timer_completed: bool,
    /// A grace countdown ran out and opened this session.
    pub started: Option<Session>,
}

pub struct FocusApp<S: KeyValueStore, C: Clock = SystemClock> {
    state: AppState,
    store: S,
    clock: C,
    sequencer: AutoResumeSequencer,
    notifier: Box<dyn Notifier>,
    timer: CountdownTimer,
    timer_reported: bool,
    events: Vec<Event>,
}

impl<S: KeyValueStore, C: Clock> FocusApp<S, C> {
    /// Restore state from `store`, running the daily reset when the stored
    /// day is stale.
    pub fn load(mut store: S, clock: C) -> Self {
        let outcome = load_state(&mut store, clock.now());
        let mut sequencer = AutoResumeSequencer::default();
        sequencer.observe_history(outcome.state.sessions.history(), clock.today());
        let mut events = Vec::new();
        if outcome.daily_reset {
            events.push(Event::DailyReset { at: clock.now() });
        }
        let timer = CountdownTimer::new(outcome.state.user_prefs.pomo_length);
        Self {
            state: outcome.state,
            store,
            clock,
            sequencer,
            notifier: Box::new(NoopNotifier),
            timer,
            timer_reported: false,
            events,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_grace_secs(mut self, secs: u32) -> Self {
        self.sequencer = AutoResumeSequencer::new(secs);
        self.sequencer
            .observe_history(self.state.sessions.history(), self.clock.today());
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn prefs(&self) -> &UserPrefs {
        &self.state.user_prefs
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sequencer(&self) -> &AutoResumeSequencer {
        &self.sequencer
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    /// Direct timer control (keyboard shortcuts). Session bookkeeping stays
    /// with the app.
    pub fn timer_mut(&mut self) -> &mut CountdownTimer {
        &mut self.timer
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.state.current_session()
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.state.current_task()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.get(id)
    }

    pub fn today_tasks(&self) -> Vec<&Task> {
        self.state.tasks.today_tasks(self.clock.now())
    }

    pub fn active_today_tasks(&self) -> Vec<&Task> {
        self.state.tasks.active_today_tasks(self.clock.now())
    }

    pub fn mit(&self) -> Option<&Task> {
        self.state.tasks.mit()
    }

    pub fn completed_mit(&self) -> Option<&Task> {
        self.state.tasks.completed_mit(self.clock.today())
    }

    pub fn todays_sessions(&self) -> Vec<&Session> {
        self.state.sessions.started_on(self.clock.today()).collect()
    }

    /// Completed focus sessions started today.
    pub fn today_focus_sessions(&self) -> Vec<&Session> {
        self.state.sessions.completed_focus_on(self.clock.today()).collect()
    }

    /// Events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Adaptive length for a break of `break_type`, sampling today's focus.
    pub fn calculate_adaptive_break_duration(&self, break_type: BreakType) -> u32 {
        breaks::calculate_adaptive_break_duration(
            break_type,
            self.state.sessions.history(),
            &self.state.user_prefs,
            self.clock.today(),
        )
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn create_task(&mut self, draft: TaskDraft) -> Result<Task, ValidationError> {
        let task = self.state.tasks.create_task(draft, self.clock.now())?.clone();
        self.persist();
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<bool, ValidationError> {
        let changed = self.state.tasks.update_task(id, patch, self.clock.now())?;
        if changed {
            self.persist();
        }
        Ok(changed)
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let deleted = self.state.tasks.delete_task(id);
        if deleted {
            if self.state.current_task_id.as_deref() == Some(id) {
                self.state.current_task_id = None;
            }
            self.sequencer.forget_task(id);
            self.persist();
        }
        deleted
    }

    pub fn toggle_complete(&mut self, id: &str) -> bool {
        let changed = self.state.tasks.toggle_complete(id, self.clock.now());
        if changed {
            self.persist();
        }
        changed
    }

    pub fn set_mit(&mut self, id: &str) -> bool {
        let changed = self.state.tasks.set_mit(id, self.clock.now());
        if changed {
            self.persist();
        }
        changed
    }

    pub fn add_subtask(&mut self, task_id: &str, title: &str) -> Option<Subtask> {
        let subtask = self.state.tasks.add_subtask(task_id, title, self.clock.now())?;
        self.persist();
        Some(subtask)
    }

    pub fn update_subtask(&mut self, task_id: &str, subtask_id: &str, patch: SubtaskPatch) -> bool {
        let changed = self
            .state
            .tasks
            .update_subtask(task_id, subtask_id, patch, self.clock.now());
        if changed {
            self.persist();
        }
        changed
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let changed = self
            .state
            .tasks
            .delete_subtask(task_id, subtask_id, self.clock.now());
        if changed {
            self.persist();
        }
        changed
    }

    pub fn reorder_tasks<T: AsRef<str>>(&mut self, ordered_ids: &[T]) {
        self.state.tasks.reorder_tasks(ordered_ids, self.clock.now());
        self.persist();
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Open a session and start its countdown. An open session is closed
    /// first as interrupted; a pending auto-resume is cancelled.
    pub fn start_session(
        &mut self,
        session_type: SessionType,
        task_id: Option<&str>,
        custom_planned_minutes: Option<u32>,
    ) -> Session {
        let now = self.clock.now();
        if let Some(event) = self.sequencer.cancel(now) {
            self.events.push(event);
        }

        let started = self.state.sessions.start(
            session_type,
            task_id.map(str::to_string),
            custom_planned_minutes,
            &self.state.user_prefs,
            now,
        );
        if let Some(interrupted) = &started.interrupted {
            tracing::info!(session_id = %interrupted.id, "open session interrupted by a new start");
            self.events.push(completed_event(interrupted, now));
        }

        let session = started.session;
        self.state.is_in_focus_mode = session_type == SessionType::Focus;
        self.state.current_task_id = session.task_id.clone();
        self.sequencer
            .observe_history(self.state.sessions.history(), self.clock.today());

        self.timer = CountdownTimer::new(session.planned_duration);
        self.timer_reported = false;
        if let Some(event) = self.timer.start() {
            self.events.push(event);
        }

        self.events.push(Event::SessionStarted {
            session_id: session.id.clone(),
            session_type,
            task_id: session.task_id.clone(),
            planned_minutes: session.planned_duration,
            at: now,
        });
        self.notifier
            .session_started(session_type, session.planned_duration);
        self.persist();
        session
    }

    /// Close the open session. `None` when nothing is open.
    pub fn complete_session(&mut self, notes: Option<String>, was_extended: bool) -> Option<Session> {
        self.finish_session(notes, was_extended, true)
    }

    fn finish_session(&mut self, notes: Option<String>, was_extended: bool, notify: bool) -> Option<Session> {
        let now = self.clock.now();
        let session = self.state.sessions.complete(notes, was_extended, now)?;
        self.state.is_in_focus_mode = false;
        if !self.timer.is_completed() {
            self.timer.stop();
        }
        self.timer_reported = true;
        self.events.push(completed_event(&session, now));

        if notify {
            let title = session
                .task_id
                .as_deref()
                .and_then(|id| self.state.tasks.get(id))
                .map(|t| t.title.as_str());
            self.notifier.session_completed(session.session_type, title);
        }
        self.persist();
        Some(session)
    }

    /// The full completion flow: close the session, apply the task side
    /// effects, then either continue straight into focus or hand over to
    /// the auto-resume sequence.
    pub fn handle_session_complete(&mut self, request: CompletionRequest) -> Option<CompletionOutcome> {
        let task_id = self.state.current_task_id.clone();
        let was_extended = request.was_extended || self.timer.was_extended();
        let session = self.complete_session(request.notes, was_extended)?;

        if let Some(id) = task_id.as_deref() {
            if request.complete_task {
                let _ = self.update_task(id, TaskPatch::status(TaskStatus::Completed));
            }
            if let Some(title) = request.new_subtask_title.as_deref() {
                self.add_subtask(id, title);
            }
        }

        let now = self.clock.now();
        let next = if request.continue_session && session.session_type == SessionType::Focus {
            self.sequencer.bypass();
            NextStep::Continued(self.start_session(SessionType::Focus, task_id.as_deref(), None))
        } else {
            let event = if session.session_type == SessionType::Focus {
                self.sequencer.on_focus_completed(
                    task_id.clone(),
                    self.state.sessions.history(),
                    &self.state.user_prefs,
                    now,
                )
            } else {
                self.sequencer.on_break_completed(&self.state.user_prefs, now)
            };
            if let Some(event) = event {
                self.events.push(event);
            }
            match self.sequencer.pending() {
                Some(pending) => NextStep::Countdown(pending.clone()),
                None => NextStep::Manual(self.sequencer.pending_type()),
            }
        };

        Some(CompletionOutcome { session, next })
    }

    /// Leave focus without finishing: an open session is closed as
    /// interrupted and no auto-resume follows.
    pub fn exit_focus(&mut self) -> Option<Session> {
        let interrupted = self.finish_session(Some(INTERRUPTED_NOTE.to_string()), false, false);
        self.sequencer.bypass();
        if self.state.is_in_focus_mode {
            self.state.is_in_focus_mode = false;
            self.persist();
        }
        interrupted
    }

    // ── Time ─────────────────────────────────────────────────────────

    /// Advance one second: the session countdown and any grace countdown.
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if let Some(event) = self.timer.tick() {
            self.events.push(event);
        }
        if self.timer.is_completed() && !self.timer_reported && self.current_session().is_some() {
            self.timer_reported = true;
            outcome.timer_completed = true;
        }
        if let Some(pending) = self.sequencer.tick() {
            outcome.started = Some(self.open_pending(pending));
        }
        outcome
    }

    /// Start the pending auto-resume session without waiting.
    pub fn start_pending_now(&mut self) -> Option<Session> {
        let pending = self.sequencer.start_now()?;
        Some(self.open_pending(pending))
    }

    /// Stop the grace countdown; the suggested type stays.
    pub fn cancel_auto_resume(&mut self) -> bool {
        match self.sequencer.cancel(self.clock.now()) {
            Some(event) => {
                self.events.push(event);
                true
            }
            None => false,
        }
    }

    fn open_pending(&mut self, pending: PendingSession) -> Session {
        self.start_session(
            pending.session_type,
            pending.task_id.as_deref(),
            pending.planned_minutes,
        )
    }

    /// Timer completions surfaced by reductions or keyboard input rather than
    /// a tick.
    pub fn take_timer_completion(&mut self) -> bool {
        if self.timer.is_completed() && !self.timer_reported && self.current_session().is_some() {
            self.timer_reported = true;
            return true;
        }
        false
    }

    // ── Preferences and resets ───────────────────────────────────────

    pub fn update_prefs(&mut self, prefs: UserPrefs) {
        self.state.user_prefs = prefs;
        self.persist();
    }

    pub fn set_pref(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.state.user_prefs.set(key, value)?;
        self.persist();
        Ok(())
    }

    /// Clear MIT flags and any open session, keeping tasks and history.
    pub fn reset_daily_data(&mut self) {
        let now = self.clock.now();
        if let Some(interrupted) = self.state.reset_daily(now) {
            self.events.push(completed_event(&interrupted, now));
        }
        self.timer.stop();
        self.sequencer.reset();
        self.events.push(Event::DailyReset { at: now });
        tracing::info!("daily data reset");
        self.persist();
    }

    /// Drop every task and session and restore default preferences.
    pub fn reset_all_data(&mut self) {
        self.state = AppState::default();
        self.timer = CountdownTimer::new(self.state.user_prefs.pomo_length);
        self.timer_reported = false;
        self.sequencer.reset();
        self.events.push(Event::DataWiped {
            at: self.clock.now(),
        });
        tracing::info!("all data wiped");
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = save_state(&mut self.store, &self.state, self.clock.now()) {
            tracing::warn!(error = %e, "failed to persist state");
        }
    }
}

fn completed_event(session: &Session, at: DateTime<Utc>) -> Event {
    Event::SessionCompleted {
        session_id: session.id.clone(),
        session_type: session.session_type,
        duration_min: session.duration,
        completed_early: session.completed_early,
        extended: session.extended,
        at,
    }
}
