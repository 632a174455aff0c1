//! Status command for showing the database location and record counts.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use wt_core::LeaveStatus;
use wt_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let employees = db.list_employees()?.len();
    let holidays = db.list_holidays()?.len();
    let tasks = db.list_tasks(None)?.len();
    let pending = db
        .list_leaves(None)?
        .iter()
        .filter(|leave| leave.status == LeaveStatus::Pending)
        .count();
    let running = db
        .list_time_logs(None, None)?
        .iter()
        .filter(|log| log.is_running)
        .count();

    writeln!(writer, "Work time status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Employees: {employees}")?;
    writeln!(writer, "Holidays: {holidays}")?;
    writeln!(writer, "Tasks: {tasks}")?;
    writeln!(writer, "Pending leave requests: {pending}")?;
    writeln!(writer, "Running timers: {running}")?;
    Ok(())
}
