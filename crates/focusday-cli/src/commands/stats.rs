use clap::Subcommand;
use focusday_core::stats::{format_duration, rollover_tasks, summarize_days, DaySummary, ScoreBand};
use focusday_core::{Clock, SessionType};

use crate::common::{open_app, short_id, CmdResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's review
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// One line per day, oldest first
    Days {
        /// Number of days ending today
        #[arg(default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Today's sessions
    Sessions,
    /// Unfinished tasks that carry over to tomorrow
    Rollover,
}

fn band_label(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Great => "great",
        ScoreBand::Good => "good",
        ScoreBand::Low => "keep going",
    }
}

fn print_summary(summary: &DaySummary) {
    println!("{}", summary.date.format("%A, %B %-d"));
    println!("  focus:     {}", format_duration(summary.total_focus_minutes));
    println!("  sessions:  {}", summary.sessions_count);
    println!("  completed: {} tasks", summary.tasks_completed.len());
    println!(
        "  score:     {}% ({})",
        summary.focus_score,
        band_label(summary.score_band())
    );
    if summary.early_completions > 0 || summary.extended_sessions > 0 {
        println!(
            "  early: {}  extended: {}",
            summary.early_completions, summary.extended_sessions
        );
    }
}

pub fn run(action: StatsAction) -> CmdResult {
    let app = open_app()?;
    let today = app.clock().today();
    let sessions = app.state().sessions.history();
    let tasks = app.state().tasks.all();

    match action {
        StatsAction::Today { json } => {
            let summary = DaySummary::build(today, sessions, tasks);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
                if let Some(mit) = app.completed_mit() {
                    println!("  MIT done:  {}", mit.title);
                } else if let Some(mit) = app.mit() {
                    println!("  MIT open:  {}", mit.title);
                }
            }
        }
        StatsAction::Days { days, json } => {
            let summaries = summarize_days(today, days.max(1), sessions, tasks);
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for s in &summaries {
                    println!(
                        "{}  {:>7}  {:>2} sessions  {:>3}%",
                        s.date,
                        format_duration(s.total_focus_minutes),
                        s.sessions_count,
                        s.focus_score
                    );
                }
            }
        }
        StatsAction::Sessions => {
            let todays = app.todays_sessions();
            if todays.is_empty() {
                println!("No sessions today");
                return Ok(());
            }
            println!("{} pomodoros completed", app.today_focus_sessions().len());
            for session in todays {
                let task = session
                    .task_id
                    .as_deref()
                    .and_then(|id| app.task(id))
                    .map(|t| t.title.as_str())
                    .unwrap_or("-");
                let mut flags = Vec::new();
                if session.session_type == SessionType::Focus && session.completed_early {
                    flags.push("early");
                }
                if session.extended {
                    flags.push("extended");
                }
                println!(
                    "{}  {:<12} {:>5.1}/{:<3} min  {}  {}",
                    session.start_at.with_timezone(&chrono::Local).format("%H:%M"),
                    session.session_type.label(),
                    session.duration,
                    session.planned_duration,
                    task,
                    flags.join(",")
                );
            }
        }
        StatsAction::Rollover => {
            let carried = rollover_tasks(tasks);
            if carried.is_empty() {
                println!("Nothing carries over");
            }
            for task in carried {
                println!("{}  {}  {}", short_id(&task.id), task.priority, task.title);
            }
        }
    }
    Ok(())
}
