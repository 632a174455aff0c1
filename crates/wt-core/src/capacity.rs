//! Task capacity allocation.
//!
//! A task's allocated hours are bounded twice: by the calendar capacity of its
//! window, and by the availability of every assignee. Availability is clipped
//! at the employee's join date, so someone who joins mid-task only contributes
//! the business days after joining.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::BusinessCalendar;
use crate::error::EngineError;
use crate::leave::Leave;
use crate::types::{LeaveStatus, UserId};

/// Employee reference data read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub user: UserId,
    pub joined_date: NaiveDate,
    pub daily_work_limit_hours: f64,
}

/// Available hours of one assignee over a task window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeCapacity {
    pub user: UserId,
    pub available_hours: u32,
}

/// Result of planning a task window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityPlan {
    pub estimated_hours: u32,
    pub assignees: Vec<AssigneeCapacity>,
    pub allocated_hours: u32,
}

/// Capacity policy: nobody is available before they joined.
///
/// Kept apart from the calendar because it is a staffing rule, not a calendar
/// fact.
pub fn tenure_window_start(task_start: NaiveDate, joined: NaiveDate) -> NaiveDate {
    task_start.max(joined)
}

/// Hours `employee` can contribute to `[start, end]`.
///
/// Zero when the employee joins after `end`.
pub fn available_hours(
    calendar: &BusinessCalendar,
    employee: &Employee,
    start: NaiveDate,
    end: NaiveDate,
) -> u32 {
    let from = tenure_window_start(start, employee.joined_date);
    calendar.working_days_to_hours(calendar.count_working_days(from, end))
}

/// Plans capacity for a task window staffed by `employees`.
pub fn plan_capacity(
    calendar: &BusinessCalendar,
    start: NaiveDate,
    end: NaiveDate,
    employees: &[Employee],
) -> Result<CapacityPlan, EngineError> {
    let estimated_hours = calendar.estimate_hours(start, end)?;
    if employees.is_empty() {
        return Err(EngineError::NoAssignees);
    }

    let assignees: Vec<AssigneeCapacity> = employees
        .iter()
        .map(|employee| AssigneeCapacity {
            user: employee.user.clone(),
            available_hours: available_hours(calendar, employee, start, end),
        })
        .collect();

    let allocated_hours = assignees
        .iter()
        .map(|a| a.available_hours)
        .fold(estimated_hours, u32::min);

    Ok(CapacityPlan {
        estimated_hours,
        assignees,
        allocated_hours,
    })
}

/// Rejects the window if any assignee has approved leave inside it.
///
/// `leaves` may contain requests of any user and status; only approved leave
/// of the listed assignees counts.
pub fn check_leave_conflicts(
    assignees: &[UserId],
    leaves: &[Leave],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), EngineError> {
    let conflict = leaves.iter().find(|leave| {
        leave.status == LeaveStatus::Approved
            && assignees.contains(&leave.user)
            && leave.overlaps(start, end)
    });
    match conflict {
        Some(leave) => Err(EngineError::AssigneeOnLeave {
            user: leave.user.clone(),
            leave: leave.id.clone(),
            start: leave.start,
            end: leave.end,
        }),
        None => Ok(()),
    }
}

/// Read-time progress projection for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Accumulated seconds across the task's work logs.
    pub consumed_seconds: i64,
    pub allocated_hours: u32,
}

impl Progress {
    #[allow(clippy::cast_precision_loss)]
    pub fn consumed_hours(&self) -> f64 {
        self.consumed_seconds.max(0) as f64 / 3600.0
    }

    /// Percentage of allocated capacity consumed, capped at 100.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u8 {
        if self.allocated_hours == 0 {
            return 0;
        }
        let ratio = 100.0 * self.consumed_hours() / f64::from(self.allocated_hours);
        ratio.round().min(100.0) as u8
    }
}
