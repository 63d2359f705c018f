//! Adaptive break length.
//!
//! Looks at the last few completed focus sessions of the day and nudges the
//! configured break length: shorter when focus sessions keep ending early,
//! longer when they keep getting extended.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::prefs::UserPrefs;
use crate::session::{Session, SessionType};

/// How many of today's focus sessions are sampled.
pub const SAMPLE_SIZE: usize = 3;

/// Minutes taken off when sessions keep ending early.
pub const EARLY_ADJUSTMENT: i64 = -1;

/// Minutes added when sessions keep getting extended.
pub const EXTENSION_ADJUSTMENT: i64 = 2;

/// Occurrences within the sample that trigger an adjustment.
const TRIGGER_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    ShortBreak,
    LongBreak,
}

impl BreakType {
    pub fn base_length(self, prefs: &UserPrefs) -> u32 {
        match self {
            BreakType::ShortBreak => prefs.short_break_length,
            BreakType::LongBreak => prefs.long_break_length,
        }
    }
}

impl From<BreakType> for SessionType {
    fn from(value: BreakType) -> Self {
        match value {
            BreakType::ShortBreak => SessionType::ShortBreak,
            BreakType::LongBreak => SessionType::LongBreak,
        }
    }
}

impl TryFrom<SessionType> for BreakType {
    type Error = SessionType;

    fn try_from(value: SessionType) -> Result<Self, Self::Error> {
        match value {
            SessionType::ShortBreak => Ok(BreakType::ShortBreak),
            SessionType::LongBreak => Ok(BreakType::LongBreak),
            SessionType::Focus => Err(value),
        }
    }
}

/// What the sample looked like, for display and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakSample {
    pub sessions: usize,
    pub avg_completion_rate: f64,
    pub early_completions: usize,
    pub extensions: usize,
}

impl BreakSample {
    fn from_sessions(sample: &[&Session]) -> Self {
        if sample.is_empty() {
            return Self::default();
        }
        let total_rate: f64 = sample.iter().map(|s| s.completion_rate()).sum();
        Self {
            sessions: sample.len(),
            avg_completion_rate: total_rate / sample.len() as f64,
            early_completions: sample.iter().filter(|s| s.completed_early).count(),
            extensions: sample.iter().filter(|s| s.extended).count(),
        }
    }

    /// Adjustment in minutes. Patterns not covered below get no adjustment,
    /// including a single early completion or a single extension.
    pub fn adjustment(&self) -> i64 {
        if self.early_completions >= TRIGGER_COUNT {
            EARLY_ADJUSTMENT
        } else if self.extensions >= TRIGGER_COUNT {
            EXTENSION_ADJUSTMENT
        } else {
            // Sustained full-length focus (avg >= 0.9 with no flags) keeps the
            // normal break, as does everything else.
            0
        }
    }
}

/// Break length in minutes for `break_type`, given the session history and
/// the calendar day to sample.
pub fn calculate_adaptive_break_duration(
    break_type: BreakType,
    history: &[Session],
    prefs: &UserPrefs,
    today: NaiveDate,
) -> u32 {
    let base = break_type.base_length(prefs);
    if !prefs.adaptive_breaks {
        return base;
    }

    let sample = recent_focus_sample(history, today);
    if sample.sessions == 0 {
        return base;
    }

    let adjusted = i64::from(base) + sample.adjustment();
    let (min, max) = bounds(prefs);
    let result = adjusted.clamp(i64::from(min), i64::from(max)) as u32;
    tracing::debug!(
        ?break_type,
        base,
        adjustment = sample.adjustment(),
        result,
        "adaptive break computed"
    );
    result
}

/// The last [`SAMPLE_SIZE`] completed focus sessions started on `today`.
pub fn recent_focus_sample(history: &[Session], today: NaiveDate) -> BreakSample {
    let todays: Vec<&Session> = history
        .iter()
        .filter(|s| s.session_type == SessionType::Focus && s.completed && s.started_on(today))
        .collect();
    let start = todays.len().saturating_sub(SAMPLE_SIZE);
    BreakSample::from_sessions(&todays[start..])
}

/// Clamp bounds; a min configured above the max collapses onto the max.
fn bounds(prefs: &UserPrefs) -> (u32, u32) {
    let max = prefs.max_break_length;
    (prefs.min_break_length.min(max), max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::{Duration, Utc};

    fn focus(at: chrono::DateTime<Utc>, duration: f64, early: bool, extended: bool) -> Session {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: None,
            start_at: at,
            end_at: Some(at + Duration::minutes(duration as i64)),
            duration,
            planned_duration: 25,
            session_type: SessionType::Focus,
            notes: None,
            completed: true,
            completed_early: early,
            extended,
        }
    }

    fn setup() -> (ManualClock, UserPrefs) {
        (ManualClock::at_local_noon(), UserPrefs::default())
    }

    #[test]
    fn disabled_returns_base() {
        let (clock, mut prefs) = setup();
        prefs.adaptive_breaks = false;
        let history = vec![focus(clock.now(), 5.0, true, false), focus(clock.now(), 5.0, true, false)];
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 5);
        let got = calculate_adaptive_break_duration(BreakType::LongBreak, &history, &prefs, clock.today());
        assert_eq!(got, 15);
    }

    #[test]
    fn no_sessions_today_returns_base() {
        let (clock, prefs) = setup();
        let yesterday = clock.now() - Duration::days(1);
        let history = vec![focus(yesterday, 5.0, true, false), focus(yesterday, 5.0, true, false)];
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 5);
    }

    #[test]
    fn full_sessions_keep_base() {
        let (clock, prefs) = setup();
        let history: Vec<_> = (0..3).map(|_| focus(clock.now(), 25.0, false, false)).collect();
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 5);
    }

    #[test]
    fn two_extensions_add_two_minutes() {
        let (clock, prefs) = setup();
        let history = vec![
            focus(clock.now(), 27.0, false, true),
            focus(clock.now(), 28.0, false, true),
        ];
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 7);
        // 15 + 2 clamps to the 10-minute ceiling.
        let got = calculate_adaptive_break_duration(BreakType::LongBreak, &history, &prefs, clock.today());
        assert_eq!(got, 10);
    }

    #[test]
    fn two_early_completions_take_a_minute_off() {
        let (clock, prefs) = setup();
        let history = vec![
            focus(clock.now(), 25.0, false, false),
            focus(clock.now(), 10.0, true, false),
            focus(clock.now(), 12.0, true, true),
        ];
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 4);
    }

    #[test]
    fn early_rule_wins_over_extension_rule() {
        let (clock, _) = setup();
        let history = vec![
            focus(clock.now(), 10.0, true, true),
            focus(clock.now(), 10.0, true, true),
        ];
        let sample = recent_focus_sample(&history, clock.today());
        assert_eq!(sample.adjustment(), EARLY_ADJUSTMENT);
    }

    #[test]
    fn single_early_completion_is_not_adjusted() {
        let (clock, prefs) = setup();
        let history = vec![
            focus(clock.now(), 25.0, false, false),
            focus(clock.now(), 10.0, true, false),
        ];
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 5);
    }

    #[test]
    fn only_last_three_sessions_are_sampled() {
        let (clock, prefs) = setup();
        let history = vec![
            focus(clock.now(), 10.0, true, false),
            focus(clock.now(), 10.0, true, false),
            focus(clock.now(), 25.0, false, false),
            focus(clock.now(), 25.0, false, false),
            focus(clock.now(), 25.0, false, false),
        ];
        let sample = recent_focus_sample(&history, clock.today());
        assert_eq!(sample.sessions, 3);
        assert_eq!(sample.early_completions, 0);
        assert!((sample.avg_completion_rate - 1.0).abs() < 1e-9);
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 5);
    }

    #[test]
    fn result_respects_floor() {
        let (clock, mut prefs) = setup();
        prefs.short_break_length = 3;
        let history = vec![
            focus(clock.now(), 5.0, true, false),
            focus(clock.now(), 5.0, true, false),
        ];
        let got = calculate_adaptive_break_duration(BreakType::ShortBreak, &history, &prefs, clock.today());
        assert_eq!(got, 3);
    }

    #[test]
    fn break_types_convert_to_session_types() {
        assert_eq!(SessionType::from(BreakType::LongBreak), SessionType::LongBreak);
        assert_eq!(BreakType::try_from(SessionType::Focus), Err(SessionType::Focus));
    }
}
