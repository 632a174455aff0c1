//! Leave accrual, balance and overlap rules.
//!
//! Annual leave accrues in twelfths of the yearly entitlement for every whole
//! calendar month employed. Requests are validated in a fixed order so callers
//! always see the same error first:
//!
//! 1. the range must contain at least one business day,
//! 2. annual leave must fit the remaining balance,
//! 3. the range must not intersect another non-rejected request.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{BusinessCalendar, ranges_overlap};
use crate::error::EngineError;
use crate::types::{LeaveId, LeaveStatus, LeaveType, UserId};

/// Slack for comparing day counts against fractional balances.
const BALANCE_EPSILON: f64 = 1e-9;

/// A persisted leave request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leave {
    pub id: LeaveId,
    pub user: UserId,
    pub leave_type: LeaveType,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for a new leave request or a revised one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveApplication {
    pub user: UserId,
    pub leave_type: LeaveType,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: String,
}

/// Partial update of a pending leave request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeavePatch {
    pub leave_type: Option<LeaveType>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub reason: Option<String>,
}

impl LeavePatch {
    /// True when the patch changes a field that affects validation.
    pub const fn touches_schedule(&self) -> bool {
        self.leave_type.is_some() || self.start.is_some() || self.end.is_some()
    }
}

/// Decision an admin records on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveDecision {
    Approve,
    Reject,
}

impl LeaveDecision {
    pub const fn status(self) -> LeaveStatus {
        match self {
            Self::Approve => LeaveStatus::Approved,
            Self::Reject => LeaveStatus::Rejected,
        }
    }
}

impl Leave {
    /// Creates a pending leave from a validated application.
    pub fn from_application(app: LeaveApplication, now: DateTime<Utc>) -> Self {
        Self {
            id: LeaveId::generate(),
            user: app.user,
            leave_type: app.leave_type,
            start: app.start,
            end: app.end,
            reason: app.reason,
            status: LeaveStatus::Pending,
            processed_by: None,
            admin_comment: None,
            created_at: now,
        }
    }

    /// The application this leave would be if re-submitted with `patch`.
    pub fn patched(&self, patch: &LeavePatch) -> LeaveApplication {
        LeaveApplication {
            user: self.user.clone(),
            leave_type: patch.leave_type.unwrap_or(self.leave_type),
            start: patch.start.unwrap_or(self.start),
            end: patch.end.unwrap_or(self.end),
            reason: patch.reason.clone().unwrap_or_else(|| self.reason.clone()),
        }
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        ranges_overlap(start, end, self.start, self.end)
    }

    /// Requester-side guard for edit and cancel.
    pub fn ensure_owner_can_modify(&self, actor: &UserId) -> Result<(), EngineError> {
        if &self.user != actor {
            return Err(EngineError::Forbidden {
                reason: "only the requester may change a leave request",
            });
        }
        if self.status != LeaveStatus::Pending {
            return Err(EngineError::NotPending {
                leave: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Records an admin decision. Only pending requests can be processed.
    pub fn process(
        &mut self,
        admin: &UserId,
        decision: LeaveDecision,
        comment: Option<String>,
    ) -> Result<(), EngineError> {
        if self.status != LeaveStatus::Pending {
            return Err(EngineError::AlreadyProcessed {
                leave: self.id.clone(),
                status: self.status,
            });
        }
        self.status = decision.status();
        self.processed_by = Some(admin.clone());
        self.admin_comment = comment.filter(|c| !c.trim().is_empty());
        Ok(())
    }
}

/// Whole calendar months between `joined` and `today`, ignoring day-of-month.
///
/// Never negative: a future join date yields zero.
pub fn months_employed(joined: NaiveDate, today: NaiveDate) -> u32 {
    let months = (today.year() - joined.year()) * 12 + today.month() as i32 - joined.month() as i32;
    u32::try_from(months).unwrap_or(0)
}

/// Annual leave position of one employee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeaveBalance {
    /// Unrounded accrued days.
    pub earned_days: f64,
    /// Business days of approved annual leave.
    pub taken_days: u32,
}

impl LeaveBalance {
    pub fn remaining_days(&self) -> f64 {
        self.earned_days - f64::from(self.taken_days)
    }

    /// Whether `requested` business days fit the unrounded remaining balance.
    pub fn covers(&self, requested: u32) -> bool {
        f64::from(requested) <= self.remaining_days() + BALANCE_EPSILON
    }
}

/// Rounds a day count to one decimal for display.
pub fn round_tenth(days: f64) -> f64 {
    (days * 10.0).round() / 10.0
}

/// Computes the employee's annual leave balance as of `today`.
pub fn leave_balance(
    calendar: &BusinessCalendar,
    annual_leave_days: f64,
    joined: NaiveDate,
    leaves: &[Leave],
    today: NaiveDate,
) -> LeaveBalance {
    let months = f64::from(months_employed(joined, today));
    let earned_days = months * annual_leave_days / 12.0;
    let taken_days = leaves
        .iter()
        .filter(|l| l.status == LeaveStatus::Approved && l.leave_type == LeaveType::Annual)
        .map(|l| calendar.count_working_days(l.start, l.end))
        .sum();
    LeaveBalance {
        earned_days,
        taken_days,
    }
}

/// Validates an application against the user's existing requests.
///
/// `existing` must contain only the applicant's own leaves. `exclude` skips the
/// request being edited so it does not overlap itself. Returns the number of
/// business days the request consumes.
pub fn validate_application(
    calendar: &BusinessCalendar,
    balance: &LeaveBalance,
    existing: &[Leave],
    app: &LeaveApplication,
    exclude: Option<&LeaveId>,
) -> Result<u32, EngineError> {
    let requested = calendar.count_working_days(app.start, app.end);
    if requested == 0 {
        return Err(EngineError::EmptyRange {
            start: app.start,
            end: app.end,
        });
    }

    if app.leave_type == LeaveType::Annual && !balance.covers(requested) {
        return Err(EngineError::InsufficientBalance {
            requested,
            remaining: round_tenth(balance.remaining_days()),
        });
    }

    if let Some(conflict) = existing.iter().find(|l| {
        Some(&l.id) != exclude
            && l.status != LeaveStatus::Rejected
            && l.overlaps(app.start, app.end)
    }) {
        return Err(EngineError::OverlappingLeave {
            existing: conflict.id.clone(),
            start: conflict.start,
            end: conflict.end,
        });
    }

    Ok(requested)
}
