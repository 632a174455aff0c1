//! Domain errors raised by engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{LeaveId, LeaveStatus, ProjectCode, UserId};

/// Errors produced by the accounting engine.
///
/// All variants are recoverable validation failures: the operation that raised
/// them has not written anything.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A date could not be parsed, or a range was inverted where `start <= end`
    /// is required.
    #[error("invalid date range: {message}")]
    InvalidRange { message: String },

    /// The requested range contains no business days.
    #[error("no working days between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    /// Annual leave request exceeds the accrued balance.
    #[error("insufficient leave balance: requested {requested} day(s), {remaining:.1} remaining")]
    InsufficientBalance { requested: u32, remaining: f64 },

    /// The request intersects another non-rejected leave of the same user.
    #[error("leave overlaps existing request {existing} ({start} to {end})")]
    OverlappingLeave {
        existing: LeaveId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Another task already uses this project code.
    #[error("project code already exists: {0}")]
    DuplicateProjectCode(ProjectCode),

    /// A task must have at least one assignee.
    #[error("task must have at least one assignee")]
    NoAssignees,

    /// An assignee has approved leave inside the task window.
    #[error("{user} is on approved leave from {start} to {end}")]
    AssigneeOnLeave {
        user: UserId,
        leave: LeaveId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// The user has no open time log.
    #[error("no active timer for {user}")]
    NoActiveSession { user: UserId },

    /// The leave has already been approved or rejected.
    #[error("leave {leave} was already {status}")]
    AlreadyProcessed { leave: LeaveId, status: LeaveStatus },

    /// A processed leave cannot be edited or cancelled by its requester.
    #[error("leave {leave} is {status} and can no longer be changed")]
    NotPending { leave: LeaveId, status: LeaveStatus },

    /// The acting user may not perform this operation.
    #[error("forbidden: {reason}")]
    Forbidden { reason: &'static str },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl EngineError {
    pub fn invalid_range(start: NaiveDate, end: NaiveDate) -> Self {
        Self::InvalidRange {
            message: format!("start {start} is after end {end}"),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
