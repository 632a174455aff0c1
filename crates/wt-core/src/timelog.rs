//! Per-user work/break session state machine.
//!
//! A user is `Idle` (no open log), `Working` or `OnBreak`. Work time is banked
//! into `duration_seconds` whenever a work segment ends; resuming from a break
//! moves the segment clock to the resume instant, so break time never enters
//! the duration.
//!
//! ```text
//! Idle --start--> Working --toggle--> OnBreak --toggle--> Working
//!                    |                   |
//!                    +------stop---------+--> Idle
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{LogId, LogType, TaskId, UserId};

/// Timer state of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Working,
    OnBreak,
}

/// A work session against a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: LogId,
    pub user: UserId,
    pub task: TaskId,
    /// Start of the current segment. Reset on resume.
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Work seconds banked so far.
    pub duration_seconds: i64,
    pub log_type: LogType,
    pub is_running: bool,
    /// Calendar day (UTC) the session started on.
    pub day_key: NaiveDate,
}

fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}

impl TimeLog {
    /// Opens a running work log at `now`.
    pub fn open(user: UserId, task: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            id: LogId::generate(),
            user,
            task,
            start_time: now,
            end_time: None,
            duration_seconds: 0,
            log_type: LogType::Work,
            is_running: true,
            day_key: now.date_naive(),
        }
    }

    pub const fn state(&self) -> TimerState {
        match (self.is_running, self.log_type) {
            (false, _) => TimerState::Idle,
            (true, LogType::Work) => TimerState::Working,
            (true, LogType::Break) => TimerState::OnBreak,
        }
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.is_running {
            Ok(())
        } else {
            Err(EngineError::NoActiveSession {
                user: self.user.clone(),
            })
        }
    }

    /// Switches between work and break at `now`, returning the new state.
    pub fn toggle_pause(&mut self, now: DateTime<Utc>) -> Result<TimerState, EngineError> {
        self.ensure_running()?;
        match self.log_type {
            LogType::Work => {
                self.duration_seconds += elapsed_seconds(self.start_time, now);
                self.log_type = LogType::Break;
            }
            LogType::Break => {
                self.start_time = now;
                self.log_type = LogType::Work;
            }
        }
        Ok(self.state())
    }

    /// Closes the log at `now` and returns the whole minutes to credit.
    ///
    /// Stopping mid-break banks nothing further and the log keeps its break
    /// type, so it credits no minutes.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<i64, EngineError> {
        self.ensure_running()?;
        if self.log_type == LogType::Work {
            self.duration_seconds += elapsed_seconds(self.start_time, now);
        }
        self.end_time = Some(now);
        self.is_running = false;
        Ok(self.credited_minutes())
    }

    /// Banked seconds rounded to the nearest minute. Break logs credit none.
    pub fn credited_minutes(&self) -> i64 {
        match self.log_type {
            LogType::Work => (self.duration_seconds.max(0) + 30) / 60,
            LogType::Break => 0,
        }
    }

    /// Work seconds as of `now`, including the segment in progress.
    pub fn worked_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        if self.is_running && self.log_type == LogType::Work {
            self.duration_seconds + elapsed_seconds(self.start_time, now)
        } else {
            self.duration_seconds
        }
    }
}

/// State of a user given their open log, if any.
pub fn timer_state(open: Option<&TimeLog>) -> TimerState {
    open.map_or(TimerState::Idle, TimeLog::state)
}
