//! End-to-end tests driving the `wt` binary.
//!
//! Each test gets its own HOME and config file so runs never touch the
//! user's real database.

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn wt_binary() -> String {
    env!("CARGO_BIN_EXE_wt").to_string()
}

struct Sandbox {
    temp: TempDir,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        let db_path = temp.path().join("data").join("wt.db");
        std::fs::write(
            &config,
            format!("database_path = {:?}\n", db_path.display().to_string()),
        )
        .unwrap();
        Self { temp, config }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(wt_binary())
            .env("HOME", self.temp.path())
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("XDG_DATA_HOME")
            .env_remove("WT_DATABASE_PATH")
            .env_remove("WT_WORKDAY_HOURS")
            .env_remove("WT_ANNUAL_LEAVE_DAYS")
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .output()
            .expect("failed to run wt")
    }

    /// Runs a command that must succeed and returns its stdout.
    fn ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "wt {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&self.ok(args)).unwrap()
    }
}

/// Test the task lifecycle: plan, track time with a break, then delete.
#[test]
fn test_task_and_timer_flow() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["employee", "set", "alice", "--joined", "2020-01-01"]);
    sandbox.ok(&["holiday", "add", "2030-03-06", "Founders Day"]);

    let created = sandbox.ok(&[
        "task",
        "create",
        "--title",
        "Build API",
        "--code",
        "PRJ-1",
        "--assignee",
        "alice",
        "--start",
        "2030-03-04",
        "--end",
        "2030-03-08",
    ]);
    assert!(created.contains("36h estimated, 36h allocated"), "{created}");

    let tasks = sandbox.json(&["task", "list", "--json"]);
    let task_id = tasks[0]["id"].as_str().unwrap().to_string();

    sandbox.ok(&["timer", "start", &task_id, "--user", "alice"]);
    let status = sandbox.json(&["timer", "status", "--user", "alice", "--json"]);
    assert_eq!(status["state"], "working");
    assert_eq!(status["task"], task_id.as_str());

    sandbox.ok(&["timer", "pause", "--user", "alice"]);
    let status = sandbox.json(&["timer", "status", "--user", "alice", "--json"]);
    assert_eq!(status["state"], "on_break");

    sandbox.ok(&["timer", "stop", "--user", "alice"]);
    let stopped_again = sandbox.run(&["timer", "stop", "--user", "alice"]);
    assert!(!stopped_again.status.success());
    assert!(String::from_utf8_lossy(&stopped_again.stderr).contains("no active timer for alice"));

    let task = sandbox.json(&["task", "show", &task_id, "--json"]);
    assert_eq!(task["status"], "in_progress");

    sandbox.ok(&["task", "delete", &task_id]);
    let tasks = sandbox.json(&["task", "list", "--json"]);
    assert_eq!(tasks.as_array().unwrap().len(), 0);
}

/// Test that leave approval blocks planning work over the leave.
#[test]
fn test_leave_blocks_task_assignment() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["employee", "set", "bob", "--joined", "2020-01-01"]);
    sandbox.ok(&[
        "leave", "apply", "--user", "bob", "--type", "sick", "--start", "2030-03-05", "--end",
        "2030-03-06",
    ]);
    let leaves = sandbox.json(&["leave", "list", "--user", "bob", "--json"]);
    let leave_id = leaves[0]["id"].as_str().unwrap().to_string();
    assert_eq!(leaves[0]["business_days"], 2);

    sandbox.ok(&["leave", "process", &leave_id, "approve", "--admin", "boss"]);
    let reprocessed = sandbox.run(&["leave", "process", &leave_id, "reject", "--admin", "boss"]);
    assert!(!reprocessed.status.success());

    let blocked = sandbox.run(&[
        "task",
        "create",
        "--title",
        "Migration",
        "--code",
        "OPS-7",
        "--assignee",
        "bob",
        "--start",
        "2030-03-04",
        "--end",
        "2030-03-08",
    ]);
    assert!(!blocked.status.success());
    assert!(String::from_utf8_lossy(&blocked.stderr).contains("bob is on approved leave"));

    let status = sandbox.ok(&["status"]);
    assert!(status.contains("Tasks: 0"), "{status}");
    assert!(status.contains("Pending leave requests: 0"), "{status}");
}

/// Test that domain errors exit non-zero without writing anything.
#[test]
fn test_weekend_leave_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["employee", "set", "carol", "--joined", "2020-01-01"]);
    let output = sandbox.run(&[
        "leave", "apply", "--user", "carol", "--type", "annual", "--start", "2030-03-02", "--end",
        "2030-03-03",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no working days"));

    let leaves = sandbox.json(&["leave", "list", "--json"]);
    assert_eq!(leaves.as_array().unwrap().len(), 0);
}

/// Test that the configured workday length drives estimates.
#[test]
fn test_workday_hours_from_config() {
    let sandbox = Sandbox::new();
    let mut config = std::fs::read_to_string(&sandbox.config).unwrap();
    config.push_str("workday_hours = 8\n");
    std::fs::write(&sandbox.config, config).unwrap();

    sandbox.ok(&["employee", "set", "dave", "--joined", "2020-01-01"]);
    let created = sandbox.ok(&[
        "task",
        "create",
        "--title",
        "Docs",
        "--code",
        "DOC-1",
        "--assignee",
        "dave",
        "--start",
        "2030-03-04",
        "--end",
        "2030-03-08",
    ]);
    assert!(created.contains("40h estimated, 40h allocated"), "{created}");
}
