//! Storage layer and transactional engine operations.
//!
//! Persists holidays, employees, tasks, time logs and leave requests using
//! `rusqlite`, and runs every engine operation as one SQLite transaction so a
//! failed validation or a crash never leaves a partial write.
//!
//! # Concurrency
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Mutating operations take `&mut self`, so a single handle is
//! serialized by the borrow checker. Separate handles (threads or processes)
//! opened on the same file are serialized by SQLite itself: every write begins
//! with `BEGIN IMMEDIATE`, which takes the database write lock before the
//! current state is read. Writers that find the lock held wait up to
//! [`BUSY_TIMEOUT`].
//!
//! SQLite has a single write lock for the whole file, so timer calls from
//! different users also queue behind each other. Every write transaction is a
//! handful of statements, which keeps the wait short; per-user parallelism is
//! given up in exchange for plain all-or-nothing transactions.
//!
//! The timer invariant "at most one running log per user" is additionally
//! enforced by a partial unique index, so even a writer that bypasses this
//! crate cannot create a second running log.
//!
//! # Schema
//!
//! ## Date Format
//!
//! Calendar days (holidays, leave and task windows, join dates) are stored as
//! TEXT `YYYY-MM-DD`; they carry no time-of-day or zone. Instants (timer
//! segments, creation times) are stored as RFC 3339 UTC text, whose
//! lexicographic order matches chronological order.
//!
//! ## Holiday Cache
//!
//! Holidays are read-heavy reference data on the hot path of task planning and
//! leave validation. Each handle caches them after first use and drops the cache
//! on [`Database::add_holiday`] and [`Database::remove_holiday`]. Holidays
//! changed through another handle become visible once this handle is reopened.

mod employees;
mod holidays;
mod leaves;
mod tasks;
mod timelogs;

use std::cell::RefCell;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use thiserror::Error;
use wt_core::{BusinessCalendar, DATE_FORMAT, EngineConfig, EngineError, ValidationError};

pub use timelogs::TimerStatus;

/// How long a writer waits for another connection's transaction.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A domain rule rejected the operation; nothing was written.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// An identifier or enum value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DbError {
    /// Returns the domain error, if this is one.
    pub const fn engine(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for concurrency and caching.
pub struct Database {
    conn: Connection,
    config: EngineConfig,
    calendar: RefCell<Option<BusinessCalendar>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self {
            conn,
            config: EngineConfig::default(),
            calendar: RefCell::new(None),
        };
        db.init()?;
        Ok(db)
    }

    /// Replaces the policy configuration used by engine operations.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self.calendar = RefCell::new(None);
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS holidays (
                date TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS employees (
                user_id TEXT PRIMARY KEY,
                joined_date TEXT NOT NULL,
                daily_work_limit_hours REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                project_code TEXT NOT NULL UNIQUE,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                priority TEXT NOT NULL,
                estimated_hours INTEGER NOT NULL,
                allocated_hours INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_assignees (
                task_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                consumed_minutes INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (task_id, user_id),
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_task_assignees_user ON task_assignees(user_id);

            -- start_time: start of the current segment, reset on resume
            -- duration_seconds: banked work seconds
            CREATE TABLE IF NOT EXISTS time_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                log_type TEXT NOT NULL,
                is_running INTEGER NOT NULL,
                day_key TEXT NOT NULL,
                FOREIGN KEY (task_id) REFERENCES tasks(id)
            );

            CREATE INDEX IF NOT EXISTS idx_time_logs_task ON time_logs(task_id);
            CREATE INDEX IF NOT EXISTS idx_time_logs_user_day ON time_logs(user_id, day_key);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_time_logs_one_running
                ON time_logs(user_id) WHERE is_running = 1;

            CREATE TABLE IF NOT EXISTS leaves (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                leave_type TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                reason TEXT NOT NULL,
                status TEXT NOT NULL,
                processed_by TEXT,
                admin_comment TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_leaves_user ON leaves(user_id, start_date);
            ",
        )?;
        Ok(())
    }

    /// Returns the business calendar, loading holidays on first use.
    pub fn calendar(&self) -> Result<BusinessCalendar, DbError> {
        if let Some(calendar) = self.calendar.borrow().as_ref() {
            return Ok(calendar.clone());
        }
        let holidays = holidays::load_holidays(&self.conn)?;
        let calendar = BusinessCalendar::from_holidays(&holidays, self.config.workday_hours);
        tracing::debug!(holidays = holidays.len(), "loaded holiday calendar");
        *self.calendar.borrow_mut() = Some(calendar.clone());
        Ok(calendar)
    }

    fn invalidate_calendar(&mut self) {
        tracing::debug!("holiday cache invalidated");
        *self.calendar.get_mut() = None;
    }
}

/// Begins a write transaction holding the database write lock.
fn write_tx(conn: &mut Connection) -> Result<Transaction<'_>, DbError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reads a TEXT column and parses it, reporting failures as conversion errors.
fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

/// Like [`parse_col`] for nullable columns.
fn parse_opt_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        raw.parse()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
    })
    .transpose()
}
