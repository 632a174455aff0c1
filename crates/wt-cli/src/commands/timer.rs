//! Work session timer.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use wt_core::{LogId, LogType, TaskId, TimerState, UserId};
use wt_db::Database;

use super::util::{format_duration, write_json};
use crate::TimerAction;

#[derive(Debug, Serialize)]
struct TimerJson<'a> {
    user: &'a UserId,
    state: TimerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_id: Option<&'a LogId>,
    worked_seconds: i64,
}

/// Project code of a task, falling back to its id.
fn task_label(db: &Database, id: &TaskId) -> Result<String> {
    Ok(db
        .get_task(id)?
        .map_or_else(|| id.to_string(), |task| task.project_code.to_string()))
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: TimerAction,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        TimerAction::Start { task, user } => {
            let log = db.start_timer_at(&user, &task, now)?;
            writeln!(
                writer,
                "Timer started for {user} on {}.",
                task_label(db, &log.task)?
            )?;
        }
        TimerAction::Pause { user } => {
            let log = db.toggle_pause_at(&user, now)?;
            let label = task_label(db, &log.task)?;
            match log.state() {
                TimerState::OnBreak => writeln!(
                    writer,
                    "{user} is on a break from {label} ({} worked).",
                    format_duration(log.duration_seconds)
                )?,
                TimerState::Working => writeln!(writer, "{user} resumed work on {label}.")?,
                TimerState::Idle => writeln!(writer, "{user} has no active timer.")?,
            }
        }
        TimerAction::Stop { user } => {
            let log = db.stop_timer_at(&user, now)?;
            if log.log_type == LogType::Break {
                writeln!(
                    writer,
                    "Timer stopped for {user} on {} during a break: nothing credited.",
                    task_label(db, &log.task)?
                )?;
                return Ok(());
            }
            let minutes = log.credited_minutes();
            writeln!(
                writer,
                "Timer stopped for {user} on {}: {} worked ({minutes} minute{} credited).",
                task_label(db, &log.task)?,
                format_duration(log.duration_seconds),
                if minutes == 1 { "" } else { "s" }
            )?;
        }
        TimerAction::Status { user, json } => {
            let status = db.timer_status_at(&user, now)?;
            let open = status.open_log.as_ref();
            if json {
                return write_json(
                    writer,
                    &TimerJson {
                        user: &status.user,
                        state: status.state,
                        task: open.map(|log| &log.task),
                        log_id: open.map(|log| &log.id),
                        worked_seconds: status.worked_seconds,
                    },
                );
            }
            let Some(log) = open else {
                writeln!(writer, "{user} has no active timer.")?;
                return Ok(());
            };
            let label = task_label(db, &log.task)?;
            let worked = format_duration(status.worked_seconds);
            if status.state == TimerState::OnBreak {
                writeln!(writer, "{user} is on a break from {label} ({worked} worked).")?;
            } else {
                writeln!(writer, "{user} is working on {label} ({worked} worked).")?;
            }
        }
    }
    Ok(())
}
