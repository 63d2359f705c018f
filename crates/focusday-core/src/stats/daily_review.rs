//! End-of-day review: how much focus happened and what got done.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionType};
use crate::task::Task;

/// Summary of one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    /// Minutes, one decimal.
    pub total_focus_minutes: f64,
    pub sessions_count: usize,
    pub planned_minutes: u32,
    /// Ids of tasks completed on the day.
    pub tasks_completed: Vec<String>,
    /// Focus minutes over planned minutes, as a rounded percentage.
    pub focus_score: u32,
    pub early_completions: usize,
    pub extended_sessions: usize,
}

impl DaySummary {
    pub fn build(date: NaiveDate, sessions: &[Session], tasks: &[Task]) -> Self {
        let focus: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.session_type == SessionType::Focus && s.completed && s.started_on(date))
            .collect();

        let total: f64 = focus.iter().map(|s| s.duration).sum();
        let planned: u32 = focus.iter().map(|s| s.planned_duration).sum();
        let focus_score = if planned > 0 {
            (total / f64::from(planned) * 100.0).round() as u32
        } else {
            0
        };

        Self {
            date,
            total_focus_minutes: (total * 10.0).round() / 10.0,
            sessions_count: focus.len(),
            planned_minutes: planned,
            tasks_completed: tasks
                .iter()
                .filter(|t| t.completed_on(date))
                .map(|t| t.id.clone())
                .collect(),
            focus_score,
            early_completions: focus.iter().filter(|s| s.completed_early).count(),
            extended_sessions: focus.iter().filter(|s| s.extended).count(),
        }
    }

    /// Label used when rendering the score.
    pub fn score_band(&self) -> ScoreBand {
        match self.focus_score {
            90..=u32::MAX => ScoreBand::Great,
            75..=89 => ScoreBand::Good,
            _ => ScoreBand::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Great,
    Good,
    Low,
}

/// One summary per day, oldest first, ending at `last`.
pub fn summarize_days(last: NaiveDate, days: u32, sessions: &[Session], tasks: &[Task]) -> Vec<DaySummary> {
    (0..days)
        .rev()
        .filter_map(|offset| last.checked_sub_signed(Duration::days(i64::from(offset))))
        .map(|date| DaySummary::build(date, sessions, tasks))
        .collect()
}

/// Tasks that carry over into tomorrow.
pub fn rollover_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| !t.is_completed()).collect()
}

/// `45m`, `2h`, `1h 30m`.
pub fn format_duration(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    let (hours, mins) = (total / 60, total % 60);
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::prefs::UserPrefs;
    use crate::session::SessionLog;
    use crate::task::{TaskDraft, TaskStore};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45.0), "45m");
        assert_eq!(format_duration(120.0), "2h");
        assert_eq!(format_duration(90.0), "1h 30m");
        assert_eq!(format_duration(0.1), "0m");
        assert_eq!(format_duration(59.6), "1h");
    }

    #[test]
    fn test_summary_counts_completed_focus_only() {
        let clock = ManualClock::at_local_noon();
        let prefs = UserPrefs::default();
        let mut log = SessionLog::default();

        log.start(SessionType::Focus, None, None, &prefs, clock.now());
        clock.advance_secs(20 * 60);
        log.complete(None, false, clock.now());

        log.start(SessionType::ShortBreak, None, None, &prefs, clock.now());
        clock.advance_secs(5 * 60);
        log.complete(None, false, clock.now());

        log.start(SessionType::Focus, None, None, &prefs, clock.now());
        clock.advance_secs(25 * 60);
        log.complete(None, true, clock.now());

        let mut tasks = TaskStore::new();
        let id = tasks.create_task(TaskDraft::new("ship"), clock.now()).unwrap().id.clone();
        tasks.create_task(TaskDraft::new("later"), clock.now()).unwrap();
        tasks.toggle_complete(&id, clock.now());

        let summary = DaySummary::build(clock.today(), log.history(), tasks.all());
        assert_eq!(summary.sessions_count, 2);
        assert_eq!(summary.total_focus_minutes, 45.0);
        assert_eq!(summary.planned_minutes, 50);
        assert_eq!(summary.focus_score, 90);
        assert_eq!(summary.score_band(), ScoreBand::Great);
        assert_eq!(summary.tasks_completed, vec![id]);
        assert_eq!(summary.extended_sessions, 1);
        assert_eq!(rollover_tasks(tasks.all()).len(), 1);
    }

    #[test]
    fn test_empty_day_scores_zero() {
        let clock = ManualClock::at_local_noon();
        let summary = DaySummary::build(clock.today(), &[], &[]);
        assert_eq!(summary.focus_score, 0);
        assert_eq!(summary.score_band(), ScoreBand::Low);
    }

    #[test]
    fn test_summarize_days_is_oldest_first() {
        let clock = ManualClock::at_local_noon();
        let days = summarize_days(clock.today(), 3, &[], &[]);
        assert_eq!(days.len(), 3);
        assert_eq!(days[2].date, clock.today());
        assert!(days[0].date < days[1].date);
    }
}
