//! CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_focusloop"))
            .args(args)
            .env("FOCUSLOOP_DATA_DIR", self.dir.path())
            .env_remove("FOCUSLOOP_LOG")
            .output()
            .expect("failed to execute focusloop");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        (stdout, stderr, code)
    }

    fn json(&self, args: &[&str]) -> Value {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        serde_json::from_str(&stdout).expect("stdout is not JSON")
    }
}

#[test]
fn task_lifecycle() {
    let cli = Cli::new();
    let a = cli.json(&["task", "create", "First", "--estimate", "3"]);
    let b = cli.json(&["task", "create", "Second"]);
    assert_eq!(a["estimated_pomodoros"], 3);
    assert_eq!(b["completed_pomodoros"], 0);

    let active = cli.json(&["task", "list"]);
    let titles: Vec<&str> = active
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);

    let a_id = a["id"].as_str().unwrap();
    let done = cli.json(&["task", "done", a_id]);
    assert_eq!(done["completed"], true);

    let moved = cli.json(&["task", "archive-completed"]);
    assert_eq!(moved.as_array().unwrap().len(), 1);
    assert_eq!(cli.json(&["task", "list"]).as_array().unwrap().len(), 1);
    assert_eq!(
        cli.json(&["task", "list", "--archived"]).as_array().unwrap()[0]["id"],
        a["id"]
    );

    cli.json(&["task", "unarchive", a_id]);
    cli.json(&["task", "delete", a_id]);
    assert_eq!(cli.json(&["task", "list"]).as_array().unwrap().len(), 1);
}

#[test]
fn invalid_input_exits_nonzero() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["task", "create", "Too big", "--estimate", "11"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "{stderr}");

    let (_, stderr, code) = cli.run(&["task", "archive", "missing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not found"), "{stderr}");

    let (_, _, code) = cli.run(&["settings", "set", "--pomodoro", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn projects_soft_delete() {
    let cli = Cli::new();
    let p = cli.json(&["project", "create", "Thesis", "--color", "#336699"]);
    let id = p["id"].as_str().unwrap();
    let updated = cli.json(&["project", "update", id, "--title", "Dissertation"]);
    assert_eq!(updated["title"], "Dissertation");
    assert_eq!(cli.json(&["project", "list"]).as_array().unwrap().len(), 1);

    cli.json(&["project", "delete", id]);
    assert!(cli.json(&["project", "list"]).as_array().unwrap().is_empty());
}

#[test]
fn settings_round_trip() {
    let cli = Cli::new();
    assert_eq!(cli.json(&["settings", "show"])["pomodoro_length"], 25);
    let updated = cli.json(&["settings", "set", "--pomodoro", "50"]);
    assert_eq!(updated["pomodoro_length"], 50);
    assert_eq!(cli.json(&["settings", "show"])["pomodoro_length"], 50);
    assert_eq!(cli.json(&["timer", "status"])["durations_secs"]["work"], 3000);
}

#[test]
fn config_get_set() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["config", "get", "timer.tick_millis"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1000");

    let (_, _, code) = cli.run(&["config", "set", "timer.tick_millis", "5"]);
    assert_eq!(code, 0);
    assert_eq!(cli.json(&["config", "list"])["timer"]["tick_millis"], 5);

    let (_, _, code) = cli.run(&["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn timer_run_completes_and_counts() {
    let cli = Cli::new();
    cli.run(&["config", "set", "timer.tick_millis", "1"]);
    cli.run(&["config", "set", "notifications.enabled", "false"]);
    cli.json(&["settings", "set", "--pomodoro", "1"]);
    let task = cli.json(&["task", "create", "Focus"]);
    let id = task["id"].as_str().unwrap();

    let (stdout, stderr, code) = cli.run(&["timer", "run", "--task", id]);
    assert_eq!(code, 0, "{stderr}");
    let events: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.first().unwrap()["type"], "timer_started");
    assert_eq!(events.last().unwrap()["type"], "timer_completed");
    assert_eq!(events.last().unwrap()["task_id"], task["id"]);

    let active = cli.json(&["task", "list"]);
    assert_eq!(active[0]["completed_pomodoros"], 1);

    let stats = cli.json(&["stats"]);
    assert_eq!(stats["completed_pomodoros"], 1);
    assert_eq!(stats["focus_secs"], 60);
    assert!(cli.json(&["timer", "status"])["active_session"].is_null());
}

#[test]
fn timer_cancel_closes_abandoned_session() {
    let cli = Cli::new();
    assert!(cli.json(&["timer", "cancel"])["canceled"].is_null());
}

#[test]
fn completions_are_generated() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("focusloop"));
}
