//! Tasks and their planning inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProjectCode, TaskId, TaskPriority, TaskStatus, UserId};

/// One assignee of a task with the work minutes they have banked on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub user: UserId,
    #[serde(default)]
    pub consumed_minutes: i64,
}

/// A planned unit of work with committed capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub project_code: ProjectCode,
    pub assignees: Vec<Assignee>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub priority: TaskPriority,
    /// Calendar capacity of the task window.
    pub estimated_hours: u32,
    /// Capacity actually committed; never above `estimated_hours`.
    pub allocated_hours: u32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn assignee_ids(&self) -> Vec<UserId> {
        self.assignees.iter().map(|a| a.user.clone()).collect()
    }

    /// Status as reported to readers on `today`.
    ///
    /// An unfinished task past its end date reads as overdue; the stored status
    /// is left untouched.
    pub fn effective_status(&self, today: NaiveDate) -> TaskStatus {
        if self.status != TaskStatus::Completed && self.end < today {
            TaskStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Input for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub project_code: ProjectCode,
    pub assignees: Vec<UserId>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub priority: TaskPriority,
}

/// Partial task update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub assignees: Option<Vec<UserId>>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    /// True when capacity must be re-planned.
    pub const fn touches_schedule(&self) -> bool {
        self.assignees.is_some() || self.start.is_some() || self.end.is_some()
    }
}

/// Deduplicates assignees while keeping first-seen order.
pub fn normalize_assignees(users: Vec<UserId>) -> Vec<UserId> {
    let mut seen = std::collections::HashSet::new();
    users.into_iter().filter(|u| seen.insert(u.clone())).collect()
}
