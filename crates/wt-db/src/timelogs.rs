//! Timer operations over the per-user time log state machine.
//!
//! Every transition loads the user's open log and writes it back inside one
//! `BEGIN IMMEDIATE` transaction, so duplicate concurrent requests are applied
//! one after the other instead of racing.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use wt_core::timelog::timer_state;
use wt_core::{EngineError, TaskId, TaskStatus, TimeLog, TimerState, UserId};

use crate::tasks::require_task;
use crate::{Database, DbError, format_date, format_timestamp, parse_col, parse_opt_col, write_tx};

const LOG_COLUMNS: &str = "id, user_id, task_id, start_time, end_time, duration_seconds, \
                           log_type, is_running, day_key";

/// Snapshot of a user's timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerStatus {
    pub user: UserId,
    pub state: TimerState,
    pub open_log: Option<TimeLog>,
    /// Work seconds of the open log, including the running segment.
    pub worked_seconds: i64,
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<TimeLog> {
    Ok(TimeLog {
        id: parse_col(row, 0)?,
        user: parse_col(row, 1)?,
        task: parse_col(row, 2)?,
        start_time: parse_col(row, 3)?,
        end_time: parse_opt_col(row, 4)?,
        duration_seconds: row.get(5)?,
        log_type: parse_col(row, 6)?,
        is_running: row.get(7)?,
        day_key: parse_col(row, 8)?,
    })
}

fn load_open_log(conn: &Connection, user: &UserId) -> Result<Option<TimeLog>, DbError> {
    let log = conn
        .query_row(
            &format!("SELECT {LOG_COLUMNS} FROM time_logs WHERE user_id = ? AND is_running = 1"),
            [user.as_str()],
            log_from_row,
        )
        .optional()?;
    Ok(log)
}

fn require_open_log(conn: &Connection, user: &UserId) -> Result<TimeLog, DbError> {
    Ok(load_open_log(conn, user)?.ok_or_else(|| EngineError::NoActiveSession {
        user: user.clone(),
    })?)
}

fn insert_log(conn: &Connection, log: &TimeLog) -> Result<(), DbError> {
    conn.execute(
        &format!("INSERT INTO time_logs ({LOG_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
        params![
            log.id.as_str(),
            log.user.as_str(),
            log.task.as_str(),
            format_timestamp(log.start_time),
            log.end_time.map(format_timestamp),
            log.duration_seconds,
            log.log_type.as_str(),
            log.is_running,
            format_date(log.day_key),
        ],
    )?;
    Ok(())
}

fn save_log(conn: &Connection, log: &TimeLog) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE time_logs SET
            start_time = ?,
            end_time = ?,
            duration_seconds = ?,
            log_type = ?,
            is_running = ?
        WHERE id = ?
        ",
        params![
            format_timestamp(log.start_time),
            log.end_time.map(format_timestamp),
            log.duration_seconds,
            log.log_type.as_str(),
            log.is_running,
            log.id.as_str(),
        ],
    )?;
    Ok(())
}

/// Closes `log` at `now` and credits its minutes to the user on the task.
fn close_log(conn: &Connection, log: &mut TimeLog, now: DateTime<Utc>) -> Result<(), DbError> {
    let minutes = log.close(now)?;
    save_log(conn, log)?;
    if minutes > 0 {
        let credited = conn.execute(
            "
            UPDATE task_assignees
            SET consumed_minutes = consumed_minutes + ?
            WHERE task_id = ? AND user_id = ?
            ",
            params![minutes, log.task.as_str(), log.user.as_str()],
        )?;
        if credited == 0 {
            tracing::debug!(user = %log.user, task = %log.task, "timer user is not an assignee");
        }
    }
    Ok(())
}

impl Database {
    /// Starts a work session on `task`, closing any session left open.
    pub fn start_timer(&mut self, user: &UserId, task: &TaskId) -> Result<TimeLog, DbError> {
        self.start_timer_at(user, task, Utc::now())
    }

    pub fn start_timer_at(
        &mut self,
        user: &UserId,
        task: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<TimeLog, DbError> {
        let tx = write_tx(&mut self.conn)?;
        require_task(&tx, task)?;

        if let Some(mut stale) = load_open_log(&tx, user)? {
            // Closed like `stop`, so a stale break segment is never counted as work.
            tracing::warn!(user = %user, log = %stale.id, "closing timer left running");
            close_log(&tx, &mut stale, now)?;
        }

        let log = TimeLog::open(user.clone(), task.clone(), now);
        insert_log(&tx, &log)?;
        tx.execute(
            "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?",
            params![
                TaskStatus::InProgress.as_str(),
                format_timestamp(now),
                task.as_str()
            ],
        )?;
        tx.commit()?;
        tracing::debug!(user = %user, task = %task, log = %log.id, "timer started");
        Ok(log)
    }

    /// Switches the user's open session between work and break.
    pub fn toggle_pause(&mut self, user: &UserId) -> Result<TimeLog, DbError> {
        self.toggle_pause_at(user, Utc::now())
    }

    pub fn toggle_pause_at(
        &mut self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<TimeLog, DbError> {
        let tx = write_tx(&mut self.conn)?;
        let mut log = require_open_log(&tx, user)?;
        let state = log.toggle_pause(now)?;
        save_log(&tx, &log)?;
        tx.commit()?;
        tracing::debug!(user = %user, ?state, banked = log.duration_seconds, "timer toggled");
        Ok(log)
    }

    /// Closes the user's open session.
    pub fn stop_timer(&mut self, user: &UserId) -> Result<TimeLog, DbError> {
        self.stop_timer_at(user, Utc::now())
    }

    pub fn stop_timer_at(&mut self, user: &UserId, now: DateTime<Utc>) -> Result<TimeLog, DbError> {
        let tx = write_tx(&mut self.conn)?;
        let mut log = require_open_log(&tx, user)?;
        close_log(&tx, &mut log, now)?;
        tx.commit()?;
        tracing::debug!(
            user = %user,
            log = %log.id,
            seconds = log.duration_seconds,
            "timer stopped"
        );
        Ok(log)
    }

    pub fn timer_status(&self, user: &UserId) -> Result<TimerStatus, DbError> {
        self.timer_status_at(user, Utc::now())
    }

    pub fn timer_status_at(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<TimerStatus, DbError> {
        let open_log = load_open_log(&self.conn, user)?;
        Ok(TimerStatus {
            user: user.clone(),
            state: timer_state(open_log.as_ref()),
            worked_seconds: open_log.as_ref().map_or(0, |log| log.worked_seconds_at(now)),
            open_log,
        })
    }

    /// Lists time logs, newest first, optionally filtered by task and user.
    pub fn list_time_logs(
        &self,
        task: Option<&TaskId>,
        user: Option<&UserId>,
    ) -> Result<Vec<TimeLog>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {LOG_COLUMNS}
            FROM time_logs
            WHERE (?1 IS NULL OR task_id = ?1) AND (?2 IS NULL OR user_id = ?2)
            ORDER BY start_time DESC, id ASC
            "
        ))?;
        let rows = stmt.query_map(
            params![task.map(TaskId::as_str), user.map(UserId::as_str)],
            log_from_row,
        )?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}
