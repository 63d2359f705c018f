//! Task management commands for CLI.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use focusday_core::{Priority, SubtaskPatch, Task, TaskDraft, TaskPatch, TaskStatus};

use crate::common::{open_app, resolve_task_id, short_id, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Priority: p1, p2 or p3
        #[arg(long, default_value = "p2")]
        priority: Priority,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Estimated pomodoros
        #[arg(long)]
        estimate: Option<u32>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Make it today's Most Important Task
        #[arg(long)]
        mit: bool,
    },
    /// List today's tasks
    List {
        /// Include completed tasks and tasks due later
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show task details
    Show {
        /// Task ID or unique prefix
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID or unique prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        /// todo, in_progress or completed
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Toggle a task between completed and todo
    Done {
        /// Task ID or unique prefix
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID or unique prefix
        id: String,
    },
    /// Set or clear the Most Important Task
    Mit {
        /// Task ID or unique prefix; omit to show the current MIT
        id: Option<String>,
        /// Clear the MIT flag
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
    /// Reorder tasks; listed ids come first, in the given order
    Reorder {
        /// Task IDs or unique prefixes
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Manage subtasks
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Append a subtask
    Add { task: String, title: String },
    /// Toggle a subtask's completed flag
    Toggle { task: String, subtask: String },
    /// Rename a subtask
    Rename {
        task: String,
        subtask: String,
        title: String,
    },
    /// Delete a subtask
    Delete { task: String, subtask: String },
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

/// A bare date means the end of that local day.
fn parse_due(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("invalid due date: {raw}"))?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| format!("invalid due date: {raw}"))?;
    Local
        .from_local_datetime(&end_of_day)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| format!("invalid due date: {raw}"))
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "doing",
        TaskStatus::Completed => "done",
    }
}

fn print_line(task: &Task) {
    let check = if task.is_completed() { "x" } else { " " };
    let mit = if task.is_mit { " *MIT*" } else { "" };
    let (done, total) = task.subtask_progress();
    let subtasks = if total > 0 {
        format!(" [{done}/{total}]")
    } else {
        String::new()
    };
    println!(
        "[{check}] {}  {}  {}{mit}{subtasks}",
        short_id(&task.id),
        task.priority,
        task.title
    );
}

fn print_details(task: &Task) {
    println!("{} ({})", task.title, task.id);
    println!("  status:   {}", status_label(task.status));
    println!("  priority: {}", task.priority);
    if task.is_mit {
        println!("  MIT:      yes");
    }
    if let Some(estimate) = task.estimate_pomos {
        println!("  estimate: {estimate} pomodoros");
    }
    if let Some(due) = task.deadline {
        println!("  due:      {}", due.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    if !task.tags.is_empty() {
        println!("  tags:     {}", task.tags.join(", "));
    }
    if let Some(notes) = &task.notes {
        println!("  notes:    {notes}");
    }
    for subtask in &task.subtasks {
        let check = if subtask.completed { "x" } else { " " };
        println!("  [{check}] {}  {}", short_id(&subtask.id), subtask.title);
    }
}

fn resolve_subtask_id(task: &Task, needle: &str) -> Result<String, String> {
    let matches: Vec<&str> = task
        .subtasks
        .iter()
        .filter(|s| s.id == needle || s.id.starts_with(needle))
        .map(|s| s.id.as_str())
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => Err(format!("Subtask not found: {needle}")),
        _ => Err(format!("Ambiguous subtask id prefix: {needle}")),
    }
}

pub fn run(action: TaskAction) -> CmdResult {
    let mut app = open_app()?;

    match action {
        TaskAction::Add {
            title,
            priority,
            tags,
            estimate,
            due,
            notes,
            mit,
        } => {
            let mut draft = TaskDraft::new(title).priority(priority);
            if let Some(tags) = tags {
                draft = draft.tags(split_tags(&tags));
            }
            if let Some(estimate) = estimate {
                draft = draft.estimate(estimate);
            }
            if let Some(due) = due {
                draft = draft.deadline(parse_due(&due)?);
            }
            if mit {
                draft = draft.mit();
            }
            draft.notes = notes;
            let task = app.create_task(draft)?;
            println!("Task created: {}", task.id);
        }
        TaskAction::List { all, json } => {
            let tasks: Vec<&Task> = if all {
                app.state().tasks.all().iter().collect()
            } else {
                app.today_tasks()
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks for today");
            } else {
                for task in tasks {
                    print_line(task);
                }
            }
        }
        TaskAction::Show { id } => {
            let id = resolve_task_id(&app, &id)?;
            if let Some(task) = app.task(&id) {
                print_details(task);
            }
        }
        TaskAction::Update {
            id,
            title,
            notes,
            priority,
            status,
            tags,
            estimate,
            due,
            clear_due,
        } => {
            let id = resolve_task_id(&app, &id)?;
            let deadline = match (due, clear_due) {
                (Some(due), _) => Some(Some(parse_due(&due)?)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TaskPatch {
                title,
                notes: notes.map(Some),
                tags: tags.as_deref().map(split_tags),
                priority,
                estimate_pomos: estimate.map(Some),
                status,
                deadline,
                ..TaskPatch::default()
            };
            app.update_task(&id, patch)?;
            println!("Task updated: {id}");
        }
        TaskAction::Done { id } => {
            let id = resolve_task_id(&app, &id)?;
            app.toggle_complete(&id);
            let state = app.task(&id).map(|t| status_label(t.status)).unwrap_or("todo");
            println!("Task {}: {state}", short_id(&id));
        }
        TaskAction::Delete { id } => {
            let id = resolve_task_id(&app, &id)?;
            app.delete_task(&id);
            println!("Task deleted: {id}");
        }
        TaskAction::Mit { id, clear } => {
            if clear {
                app.set_mit("");
                println!("MIT cleared");
            } else if let Some(id) = id {
                let id = resolve_task_id(&app, &id)?;
                app.set_mit(&id);
                println!("MIT set: {id}");
            } else {
                match app.mit() {
                    Some(task) => print_line(task),
                    None => match app.completed_mit() {
                        Some(task) => println!("MIT done today: {}", task.title),
                        None => println!("No MIT set"),
                    },
                }
            }
        }
        TaskAction::Reorder { ids } => {
            let resolved = ids
                .iter()
                .map(|id| resolve_task_id(&app, id))
                .collect::<Result<Vec<_>, _>>()?;
            app.reorder_tasks(&resolved);
            println!("Reordered {} tasks", resolved.len());
        }
        TaskAction::Subtask { action } => run_subtask(&mut app, action)?,
    }
    Ok(())
}

fn run_subtask(app: &mut crate::common::App, action: SubtaskAction) -> CmdResult {
    match action {
        SubtaskAction::Add { task, title } => {
            let task_id = resolve_task_id(app, &task)?;
            let subtask = app
                .add_subtask(&task_id, &title)
                .ok_or_else(|| format!("Task not found: {task}"))?;
            println!("Subtask added: {}", subtask.id);
        }
        SubtaskAction::Toggle { task, subtask } => {
            let task_id = resolve_task_id(app, &task)?;
            let parent = app.task(&task_id).ok_or_else(|| format!("Task not found: {task}"))?;
            let subtask_id = resolve_subtask_id(parent, &subtask)?;
            let completed = parent
                .subtasks
                .iter()
                .find(|s| s.id == subtask_id)
                .map_or(false, |s| s.completed);
            let patch = SubtaskPatch {
                completed: Some(!completed),
                ..SubtaskPatch::default()
            };
            app.update_subtask(&task_id, &subtask_id, patch);
            println!("Subtask {}: {}", short_id(&subtask_id), if completed { "todo" } else { "done" });
        }
        SubtaskAction::Rename { task, subtask, title } => {
            let task_id = resolve_task_id(app, &task)?;
            let parent = app.task(&task_id).ok_or_else(|| format!("Task not found: {task}"))?;
            let subtask_id = resolve_subtask_id(parent, &subtask)?;
            let patch = SubtaskPatch {
                title: Some(title),
                ..SubtaskPatch::default()
            };
            app.update_subtask(&task_id, &subtask_id, patch);
            println!("Subtask renamed: {}", short_id(&subtask_id));
        }
        SubtaskAction::Delete { task, subtask } => {
            let task_id = resolve_task_id(app, &task)?;
            let parent = app.task(&task_id).ok_or_else(|| format!("Task not found: {task}"))?;
            let subtask_id = resolve_subtask_id(parent, &subtask)?;
            app.delete_subtask(&task_id, &subtask_id);
            println!("Subtask deleted: {}", short_id(&subtask_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_date_is_end_of_local_day() {
        let due = parse_due("2026-03-14").unwrap().with_timezone(&Local);
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(due.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn rfc3339_due_is_kept() {
        let due = parse_due("2026-03-14T09:30:00Z").unwrap();
        assert_eq!(due.to_rfc3339(), "2026-03-14T09:30:00+00:00");
        assert!(parse_due("next tuesday").is_err());
    }

    #[test]
    fn tags_are_split_on_commas() {
        assert_eq!(split_tags("a, b,c"), vec!["a", "b", "c"]);
    }
}
