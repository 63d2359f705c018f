//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary home directory.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusday"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("FOCUSDAY_ENV")
        .env("FOCUSDAY_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &TempDir, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn list_json(home: &TempDir) -> Vec<serde_json::Value> {
    let stdout = run_ok(home, &["task", "list", "--all", "--json"]);
    serde_json::from_str(&stdout).expect("task list --json is a JSON array")
}

#[test]
fn test_task_add_and_list() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(&home, &["task", "add", "Write report", "--priority", "p1", "--tags", "work, q3"]);
    assert!(stdout.contains("Task created:"));

    let tasks = list_json(&home);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Write report");
    assert_eq!(tasks[0]["priority"], "P1");
    assert_eq!(tasks[0]["tags"], serde_json::json!(["work", "q3"]));
}

#[test]
fn test_blank_title_is_rejected() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["task", "add", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_mit_moves_between_tasks() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["task", "add", "first", "--mit"]);
    run_ok(&home, &["task", "add", "second"]);
    let second = list_json(&home)
        .into_iter()
        .find(|t| t["title"] == "second")
        .unwrap();
    let id = second["id"].as_str().unwrap();

    run_ok(&home, &["task", "mit", &id[..8]]);
    let tasks = list_json(&home);
    let mits: Vec<&str> = tasks
        .iter()
        .filter(|t| t["is_mit"] == true)
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(mits, vec!["second"]);

    run_ok(&home, &["task", "mit", "--clear"]);
    assert!(list_json(&home).iter().all(|t| t["is_mit"] == false));
}

#[test]
fn test_task_done_toggles() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["task", "add", "ship it"]);
    let id = list_json(&home)[0]["id"].as_str().unwrap().to_string();

    let stdout = run_ok(&home, &["task", "done", &id]);
    assert!(stdout.contains("done"));
    assert_eq!(list_json(&home)[0]["status"], "completed");

    let today = run_ok(&home, &["task", "list"]);
    assert!(today.contains("[x]"));
}

#[test]
fn test_subtasks() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["task", "add", "essay"]);
    let id = list_json(&home)[0]["id"].as_str().unwrap().to_string();
    run_ok(&home, &["task", "subtask", "add", &id, "outline"]);

    let task = &list_json(&home)[0];
    assert_eq!(task["subtasks"][0]["title"], "outline");
    let sub = task["subtasks"][0]["id"].as_str().unwrap().to_string();

    run_ok(&home, &["task", "subtask", "toggle", &id, &sub]);
    assert_eq!(list_json(&home)[0]["subtasks"][0]["completed"], true);
}

#[test]
fn test_unknown_task_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["task", "show", "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Task not found"));
}

#[test]
fn test_prefs_set_and_get() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["prefs", "set", "pomo_length", "50"]);
    assert_eq!(run_ok(&home, &["prefs", "get", "pomo_length"]).trim(), "50");

    let (_, _, code) = run_cli(&home, &["prefs", "set", "pomo_length", "long"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(&home, &["prefs", "get", "no_such_pref"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    assert_eq!(run_ok(&home, &["config", "get", "timer.grace_secs"]).trim(), "10");
    run_ok(&home, &["config", "set", "timer.grace_secs", "5"]);
    assert_eq!(run_ok(&home, &["config", "get", "timer.grace_secs"]).trim(), "5");

    let list: serde_json::Value = serde_json::from_str(&run_ok(&home, &["config", "list"])).unwrap();
    assert_eq!(list["storage"]["db_file"], "focusday.db");
}

#[test]
fn test_stats_today_json() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(&home, &["stats", "today", "--json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["sessions_count"], 0);
    assert_eq!(summary["focus_score"], 0);
}

#[test]
fn test_reset_all_needs_confirmation() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["task", "add", "keep me"]);
    let (_, _, code) = run_cli(&home, &["reset", "all"]);
    assert_eq!(code, 1);
    assert_eq!(list_json(&home).len(), 1);

    run_ok(&home, &["reset", "all", "--yes"]);
    assert!(list_json(&home).is_empty());
}

#[test]
fn test_focus_keys() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(&home, &["focus", "keys"]);
    assert!(stdout.contains("Space"));
    assert!(stdout.contains("Quit"));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(&home, &["completions", "bash"]);
    assert!(stdout.contains("focusday"));
}
