//! Statistics over session history and tasks.
//!
//! Currently the daily review: focus minutes, session count, completed
//! tasks and a focus score per local calendar day.

mod daily_review;

pub use daily_review::{format_duration, rollover_tasks, summarize_days, DaySummary, ScoreBand};
