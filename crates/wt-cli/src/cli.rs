//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use wt_core::{
    LeaveDecision, LeaveId, LeaveType, ProjectCode, TaskId, TaskPriority, TaskStatus, UserId,
    parse_date,
};

/// Work time and capacity accounting.
///
/// Tracks work sessions against tasks, plans task capacity over business days
/// and manages leave requests against accrued balances.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show database location and record counts.
    Status,

    /// Manage the holiday calendar.
    #[command(subcommand)]
    Holiday(HolidayAction),

    /// Manage employee reference data.
    #[command(subcommand)]
    Employee(EmployeeAction),

    /// Apply for, review and inspect leave.
    #[command(subcommand)]
    Leave(LeaveAction),

    /// Plan and inspect tasks.
    #[command(subcommand)]
    Task(TaskAction),

    /// Track work sessions.
    #[command(subcommand)]
    Timer(TimerAction),
}

#[derive(Debug, Subcommand)]
pub enum HolidayAction {
    /// Register a holiday.
    Add {
        /// Date as YYYY-MM-DD.
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// Display name.
        name: String,
    },
    /// Remove a holiday.
    Remove {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
    /// List all holidays.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum EmployeeAction {
    /// Create or replace an employee record.
    Set {
        user: UserId,
        /// Join date as YYYY-MM-DD.
        #[arg(long, value_parser = parse_date)]
        joined: NaiveDate,
        /// Daily work limit in hours.
        #[arg(long, default_value_t = 9.0)]
        daily_limit: f64,
    },
    /// Show an employee and their leave balance.
    Show {
        user: UserId,
        #[arg(long)]
        json: bool,
    },
}

/// Decision recorded when processing a leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for LeaveDecision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => Self::Approve,
            DecisionArg::Reject => Self::Reject,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum LeaveAction {
    /// Apply for leave.
    Apply {
        /// Acting user.
        #[arg(long)]
        user: UserId,
        /// annual, sick, personal, maternity, unpaid or other.
        #[arg(long = "type")]
        leave_type: LeaveType,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Change a pending leave request.
    Edit {
        id: LeaveId,
        #[arg(long)]
        user: UserId,
        #[arg(long = "type")]
        leave_type: Option<LeaveType>,
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Withdraw a pending leave request.
    Cancel {
        id: LeaveId,
        #[arg(long)]
        user: UserId,
    },
    /// Approve or reject a pending leave request.
    Process {
        id: LeaveId,
        #[arg(value_enum)]
        decision: DecisionArg,
        /// Reviewing admin.
        #[arg(long)]
        admin: UserId,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Delete a leave in any status.
    Delete {
        id: LeaveId,
        #[arg(long)]
        admin: UserId,
    },
    /// Show a user's annual leave balance.
    Balance {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        json: bool,
    },
    /// List leave requests.
    List {
        /// Only this user's requests.
        #[arg(long)]
        user: Option<UserId>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// Create a task and plan its capacity.
    Create {
        #[arg(long)]
        title: String,
        /// Unique project code.
        #[arg(long)]
        code: ProjectCode,
        /// Assignee; repeat for several.
        #[arg(long = "assignee", required = true)]
        assignees: Vec<UserId>,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        #[arg(long, default_value_t = TaskPriority::Medium)]
        priority: TaskPriority,
    },
    /// Update a task. Changing assignees or dates re-plans capacity.
    Update {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        /// Replacement assignee list; repeat for several.
        #[arg(long = "assignee")]
        assignees: Option<Vec<UserId>>,
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Delete a task and all of its time logs.
    Delete { id: TaskId },
    /// Show a task with its progress.
    Show {
        id: TaskId,
        #[arg(long)]
        json: bool,
    },
    /// List tasks.
    List {
        /// Only tasks assigned to this user.
        #[arg(long)]
        assignee: Option<UserId>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start working on a task, closing any session left open.
    Start {
        task: TaskId,
        #[arg(long)]
        user: UserId,
    },
    /// Toggle between work and break.
    Pause {
        #[arg(long)]
        user: UserId,
    },
    /// Stop the running session.
    Stop {
        #[arg(long)]
        user: UserId,
    },
    /// Show the current session.
    Status {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_assignees() {
        let cli = Cli::try_parse_from([
            "wt", "task", "create", "--title", "Build", "--code", "PRJ-1", "--assignee", "alice",
            "--assignee", "bob", "--start", "2025-03-03", "--end", "2025-03-07",
        ])
        .unwrap();
        let Some(Commands::Task(TaskAction::Create {
            assignees,
            priority,
            ..
        })) = cli.command
        else {
            panic!("expected task create");
        };
        assert_eq!(assignees.len(), 2);
        assert_eq!(priority, TaskPriority::Medium);
    }

    #[test]
    fn rejects_malformed_dates() {
        let result = Cli::try_parse_from(["wt", "holiday", "add", "2025-13-01", "Nope"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_leave_type() {
        let result = Cli::try_parse_from([
            "wt", "leave", "apply", "--user", "alice", "--type", "vacation", "--start",
            "2025-03-03", "--end", "2025-03-04",
        ]);
        assert!(result.is_err());
    }
}
