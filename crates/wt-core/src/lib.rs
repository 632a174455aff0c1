//! Core domain logic for work time and capacity accounting.
//!
//! This crate contains the fundamental types and rules for:
//! - Calendar: holiday- and weekend-aware business-day counting
//! - Leave: accrual, balance and overlap validation
//! - Capacity: tenure-adjusted task allocation and progress
//! - Time logs: the per-user work/break session state machine
//!
//! Nothing here performs I/O; storage and transactions live in `wt-db`.

pub mod calendar;
pub mod capacity;
mod config;
mod error;
pub mod leave;
pub mod task;
pub mod timelog;
pub mod types;

pub use calendar::{BusinessCalendar, DATE_FORMAT, Holiday, parse_date, ranges_overlap};
pub use capacity::{CapacityPlan, Employee, Progress, check_leave_conflicts, plan_capacity};
pub use config::{DEFAULT_ANNUAL_LEAVE_DAYS, DEFAULT_WORKDAY_HOURS, EngineConfig};
pub use error::EngineError;
pub use leave::{Leave, LeaveApplication, LeaveBalance, LeaveDecision, LeavePatch};
pub use task::{Assignee, NewTask, Task, TaskPatch};
pub use timelog::{TimeLog, TimerState};
pub use types::{
    LeaveId, LeaveStatus, LeaveType, LogId, LogType, ProjectCode, TaskId, TaskPriority, TaskStatus,
    UserId, ValidationError,
};
