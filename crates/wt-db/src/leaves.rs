//! Leave requests: application, editing, processing and balances.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use wt_core::leave::{leave_balance, validate_application};
use wt_core::{
    BusinessCalendar, EngineConfig, EngineError, Leave, LeaveApplication, LeaveBalance,
    LeaveDecision, LeaveId, LeavePatch, LeaveType, UserId,
};

use crate::employees::load_employee;
use crate::{
    Database, DbError, format_date, format_timestamp, parse_col, parse_opt_col, write_tx,
};

const LEAVE_COLUMNS: &str = "id, user_id, leave_type, start_date, end_date, reason, status, \
                             processed_by, admin_comment, created_at";

fn leave_from_row(row: &Row<'_>) -> rusqlite::Result<Leave> {
    Ok(Leave {
        id: parse_col(row, 0)?,
        user: parse_col(row, 1)?,
        leave_type: parse_col(row, 2)?,
        start: parse_col(row, 3)?,
        end: parse_col(row, 4)?,
        reason: row.get(5)?,
        status: parse_col(row, 6)?,
        processed_by: parse_opt_col(row, 7)?,
        admin_comment: row.get(8)?,
        created_at: parse_col(row, 9)?,
    })
}

fn load_leave(conn: &Connection, id: &LeaveId) -> Result<Option<Leave>, DbError> {
    let leave = conn
        .query_row(
            &format!("SELECT {LEAVE_COLUMNS} FROM leaves WHERE id = ?"),
            [id.as_str()],
            leave_from_row,
        )
        .optional()?;
    Ok(leave)
}

fn require_leave(conn: &Connection, id: &LeaveId) -> Result<Leave, DbError> {
    Ok(load_leave(conn, id)?.ok_or_else(|| EngineError::not_found("leave", id.as_str()))?)
}

/// All leave requests of `user`, ordered by start date.
pub(crate) fn load_user_leaves(conn: &Connection, user: &UserId) -> Result<Vec<Leave>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leaves WHERE user_id = ? ORDER BY start_date ASC, id ASC"
    ))?;
    let rows = stmt.query_map([user.as_str()], leave_from_row)?;
    let mut leaves = Vec::new();
    for row in rows {
        leaves.push(row?);
    }
    Ok(leaves)
}

/// Approved leave of any of `users` intersecting `[start, end]`.
pub(crate) fn load_approved_leaves_in(
    conn: &Connection,
    users: &[UserId],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Leave>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {LEAVE_COLUMNS}
        FROM leaves
        WHERE user_id = ? AND status = 'approved' AND start_date <= ? AND end_date >= ?
        ORDER BY start_date ASC
        "
    ))?;
    let mut leaves = Vec::new();
    for user in users {
        let rows = stmt.query_map(
            params![user.as_str(), format_date(end), format_date(start)],
            leave_from_row,
        )?;
        for row in rows {
            leaves.push(row?);
        }
    }
    Ok(leaves)
}

fn insert_leave(conn: &Connection, leave: &Leave) -> Result<(), DbError> {
    conn.execute(
        &format!("INSERT INTO leaves ({LEAVE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
        params![
            leave.id.as_str(),
            leave.user.as_str(),
            leave.leave_type.as_str(),
            format_date(leave.start),
            format_date(leave.end),
            leave.reason,
            leave.status.as_str(),
            leave.processed_by.as_ref().map(UserId::as_str),
            leave.admin_comment,
            format_timestamp(leave.created_at),
        ],
    )?;
    Ok(())
}

fn update_leave(conn: &Connection, leave: &Leave) -> Result<(), DbError> {
    conn.execute(
        "
        UPDATE leaves SET
            leave_type = ?,
            start_date = ?,
            end_date = ?,
            reason = ?,
            status = ?,
            processed_by = ?,
            admin_comment = ?
        WHERE id = ?
        ",
        params![
            leave.leave_type.as_str(),
            format_date(leave.start),
            format_date(leave.end),
            leave.reason,
            leave.status.as_str(),
            leave.processed_by.as_ref().map(UserId::as_str),
            leave.admin_comment,
            leave.id.as_str(),
        ],
    )?;
    Ok(())
}

/// Annual leave balance of `user` given their stored leaves.
fn balance_for(
    conn: &Connection,
    calendar: &BusinessCalendar,
    config: &EngineConfig,
    user: &UserId,
    leaves: &[Leave],
    today: NaiveDate,
) -> Result<LeaveBalance, DbError> {
    let employee =
        load_employee(conn, user)?.ok_or_else(|| EngineError::not_found("employee", user.as_str()))?;
    Ok(leave_balance(
        calendar,
        config.annual_leave_days,
        employee.joined_date,
        leaves,
        today,
    ))
}

/// Runs the application checks against the applicant's stored leaves.
fn validate(
    conn: &Connection,
    calendar: &BusinessCalendar,
    config: &EngineConfig,
    app: &LeaveApplication,
    exclude: Option<&LeaveId>,
    today: NaiveDate,
) -> Result<u32, DbError> {
    let existing = load_user_leaves(conn, &app.user)?;
    let balance = if app.leave_type == LeaveType::Annual {
        balance_for(conn, calendar, config, &app.user, &existing, today)?
    } else {
        // Balance is not consulted for other leave types.
        LeaveBalance {
            earned_days: 0.0,
            taken_days: 0,
        }
    };
    Ok(validate_application(
        calendar, &balance, &existing, app, exclude,
    )?)
}

impl Database {
    /// Files a leave request in `Pending` status.
    pub fn apply_leave(&mut self, app: LeaveApplication) -> Result<Leave, DbError> {
        self.apply_leave_at(app, Utc::now())
    }

    pub fn apply_leave_at(
        &mut self,
        app: LeaveApplication,
        now: DateTime<Utc>,
    ) -> Result<Leave, DbError> {
        let calendar = self.calendar()?;
        let tx = write_tx(&mut self.conn)?;
        let days = validate(&tx, &calendar, &self.config, &app, None, now.date_naive())?;
        let leave = Leave::from_application(app, now);
        insert_leave(&tx, &leave)?;
        tx.commit()?;
        tracing::debug!(
            leave = %leave.id,
            user = %leave.user,
            kind = %leave.leave_type,
            days,
            "leave applied"
        );
        Ok(leave)
    }

    /// Edits a pending leave on behalf of its requester.
    ///
    /// Type or date changes are validated exactly like a new application.
    pub fn edit_leave(
        &mut self,
        id: &LeaveId,
        actor: &UserId,
        patch: &LeavePatch,
    ) -> Result<Leave, DbError> {
        self.edit_leave_at(id, actor, patch, Utc::now().date_naive())
    }

    pub fn edit_leave_at(
        &mut self,
        id: &LeaveId,
        actor: &UserId,
        patch: &LeavePatch,
        today: NaiveDate,
    ) -> Result<Leave, DbError> {
        let calendar = self.calendar()?;
        let tx = write_tx(&mut self.conn)?;
        let mut leave = require_leave(&tx, id)?;
        leave.ensure_owner_can_modify(actor)?;

        let app = leave.patched(patch);
        if patch.touches_schedule() {
            validate(&tx, &calendar, &self.config, &app, Some(id), today)?;
        }
        leave.leave_type = app.leave_type;
        leave.start = app.start;
        leave.end = app.end;
        leave.reason = app.reason;
        update_leave(&tx, &leave)?;
        tx.commit()?;
        tracing::debug!(leave = %leave.id, "leave edited");
        Ok(leave)
    }

    /// Withdraws a pending leave on behalf of its requester.
    pub fn cancel_leave(&mut self, id: &LeaveId, actor: &UserId) -> Result<(), DbError> {
        let tx = write_tx(&mut self.conn)?;
        let leave = require_leave(&tx, id)?;
        leave.ensure_owner_can_modify(actor)?;
        tx.execute("DELETE FROM leaves WHERE id = ?", [id.as_str()])?;
        tx.commit()?;
        tracing::debug!(leave = %id, "leave cancelled");
        Ok(())
    }

    /// Deletes a leave in any status. Admin-only at the calling layer.
    pub fn delete_leave_as_admin(&mut self, id: &LeaveId, admin: &UserId) -> Result<(), DbError> {
        let removed = self
            .conn
            .execute("DELETE FROM leaves WHERE id = ?", [id.as_str()])?;
        if removed == 0 {
            return Err(EngineError::not_found("leave", id.as_str()).into());
        }
        tracing::debug!(leave = %id, admin = %admin, "leave deleted");
        Ok(())
    }

    /// Approves or rejects a pending leave.
    pub fn process_leave(
        &mut self,
        id: &LeaveId,
        admin: &UserId,
        decision: LeaveDecision,
        comment: Option<String>,
    ) -> Result<Leave, DbError> {
        let tx = write_tx(&mut self.conn)?;
        let mut leave = require_leave(&tx, id)?;
        leave.process(admin, decision, comment)?;
        update_leave(&tx, &leave)?;
        tx.commit()?;
        tracing::debug!(leave = %id, admin = %admin, status = %leave.status, "leave processed");
        Ok(leave)
    }

    pub fn get_leave(&self, id: &LeaveId) -> Result<Option<Leave>, DbError> {
        load_leave(&self.conn, id)
    }

    /// Lists leaves of one user, or of everyone when `user` is `None`.
    pub fn list_leaves(&self, user: Option<&UserId>) -> Result<Vec<Leave>, DbError> {
        if let Some(user) = user {
            return load_user_leaves(&self.conn, user);
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leaves ORDER BY start_date ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], leave_from_row)?;
        let mut leaves = Vec::new();
        for row in rows {
            leaves.push(row?);
        }
        Ok(leaves)
    }

    /// Annual leave balance of `user` today.
    pub fn leave_balance(&self, user: &UserId) -> Result<LeaveBalance, DbError> {
        self.leave_balance_at(user, Utc::now().date_naive())
    }

    pub fn leave_balance_at(&self, user: &UserId, today: NaiveDate) -> Result<LeaveBalance, DbError> {
        let calendar = self.calendar()?;
        let leaves = load_user_leaves(&self.conn, user)?;
        balance_for(&self.conn, &calendar, &self.config, user, &leaves, today)
    }

    /// Business days a leave consumes under the current calendar.
    pub fn leave_days(&self, leave: &Leave) -> Result<u32, DbError> {
        Ok(self.calendar()?.count_working_days(leave.start, leave.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use wt_core::{Employee, LeaveStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    // 2025-03-03 is a Monday; alice has 12 full months by 2025-03.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_employee(&Employee {
            user: user("alice"),
            joined_date: date(2024, 3, 20),
            daily_work_limit_hours: 9.0,
        })
        .unwrap();
        db
    }

    fn app(kind: LeaveType, start: NaiveDate, end: NaiveDate) -> LeaveApplication {
        LeaveApplication {
            user: user("alice"),
            leave_type: kind,
            start,
            end,
            reason: "family".to_string(),
        }
    }

    fn approve(db: &mut Database, id: &LeaveId) {
        db.process_leave(id, &user("boss"), LeaveDecision::Approve, None)
            .unwrap();
    }

    #[test]
    fn apply_leave_persists_pending_request() {
        let mut db = setup();
        let leave = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 3), date(2025, 3, 4)), now())
            .unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);
        assert_eq!(db.get_leave(&leave.id).unwrap().unwrap(), leave);
    }

    #[test]
    fn overlap_with_approved_leave_is_rejected() {
        let mut db = setup();
        let existing = db
            .apply_leave_at(
                app(LeaveType::Personal, date(2025, 3, 11), date(2025, 3, 14)),
                now(),
            )
            .unwrap();
        approve(&mut db, &existing.id);

        let err = db
            .apply_leave_at(
                app(LeaveType::Personal, date(2025, 3, 10), date(2025, 3, 12)),
                now(),
            )
            .unwrap_err();
        assert!(matches!(err.engine(), Some(EngineError::OverlappingLeave { .. })));

        assert!(
            db.apply_leave_at(app(LeaveType::Personal, date(2025, 3, 5), date(2025, 3, 9)), now())
                .is_ok()
        );
        assert_eq!(db.list_leaves(Some(&user("alice"))).unwrap().len(), 2);
    }

    #[test]
    fn annual_leave_boundary_uses_exact_balance() {
        let mut db = setup();
        // 12 months accrued by 2025-03: 14 days earned. Take 12 (Mar 3-18).
        let taken = db
            .apply_leave_at(app(LeaveType::Annual, date(2025, 3, 3), date(2025, 3, 18)), now())
            .unwrap();
        approve(&mut db, &taken.id);
        let balance = db.leave_balance_at(&user("alice"), date(2025, 3, 1)).unwrap();
        assert_eq!(balance.taken_days, 12);

        let err = db
            .apply_leave_at(app(LeaveType::Annual, date(2025, 3, 24), date(2025, 3, 26)), now())
            .unwrap_err();
        assert!(matches!(
            err.engine(),
            Some(EngineError::InsufficientBalance { requested: 3, .. })
        ));

        assert!(
            db.apply_leave_at(app(LeaveType::Annual, date(2025, 3, 24), date(2025, 3, 25)), now())
                .is_ok()
        );
    }

    #[test]
    fn annual_leave_requires_employee_record() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db
            .apply_leave_at(app(LeaveType::Annual, date(2025, 3, 3), date(2025, 3, 3)), now())
            .unwrap_err();
        assert!(matches!(
            err.engine(),
            Some(EngineError::NotFound { entity: "employee", .. })
        ));
    }

    #[test]
    fn weekend_request_writes_nothing() {
        let mut db = setup();
        let err = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 8), date(2025, 3, 9)), now())
            .unwrap_err();
        assert!(matches!(err.engine(), Some(EngineError::EmptyRange { .. })));
        assert!(db.list_leaves(None).unwrap().is_empty());
    }

    #[test]
    fn process_twice_fails() {
        let mut db = setup();
        let leave = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 3), date(2025, 3, 4)), now())
            .unwrap();
        let processed = db
            .process_leave(
                &leave.id,
                &user("boss"),
                LeaveDecision::Reject,
                Some("busy week".to_string()),
            )
            .unwrap();
        assert_eq!(processed.status, LeaveStatus::Rejected);
        assert_eq!(processed.admin_comment.as_deref(), Some("busy week"));

        let err = db
            .process_leave(&leave.id, &user("boss"), LeaveDecision::Approve, None)
            .unwrap_err();
        assert!(matches!(err.engine(), Some(EngineError::AlreadyProcessed { .. })));
        let stored = db.get_leave(&leave.id).unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Rejected);
    }

    #[test]
    fn process_missing_leave_is_not_found() {
        let mut db = setup();
        let err = db
            .process_leave(
                &LeaveId::new("nope").unwrap(),
                &user("boss"),
                LeaveDecision::Approve,
                None,
            )
            .unwrap_err();
        assert!(matches!(err.engine(), Some(EngineError::NotFound { .. })));
    }

    #[test]
    fn edit_revalidates_new_dates() {
        let mut db = setup();
        let blocker = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 17), date(2025, 3, 18)), now())
            .unwrap();
        let leave = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 3), date(2025, 3, 4)), now())
            .unwrap();

        let clash = LeavePatch {
            end: Some(date(2025, 3, 17)),
            ..LeavePatch::default()
        };
        let err = db
            .edit_leave_at(&leave.id, &user("alice"), &clash, date(2025, 3, 1))
            .unwrap_err();
        assert!(matches!(
            err.engine(),
            Some(EngineError::OverlappingLeave { existing, .. }) if *existing == blocker.id
        ));

        let shift = LeavePatch {
            start: Some(date(2025, 3, 4)),
            end: Some(date(2025, 3, 5)),
            reason: Some("moved".to_string()),
            ..LeavePatch::default()
        };
        let edited = db
            .edit_leave_at(&leave.id, &user("alice"), &shift, date(2025, 3, 1))
            .unwrap();
        assert_eq!(edited.start, date(2025, 3, 4));
        assert_eq!(edited.reason, "moved");
    }

    #[test]
    fn requester_cannot_cancel_processed_leave_but_admin_can_delete() {
        let mut db = setup();
        let leave = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 3), date(2025, 3, 4)), now())
            .unwrap();
        approve(&mut db, &leave.id);

        let err = db.cancel_leave(&leave.id, &user("alice")).unwrap_err();
        assert!(matches!(err.engine(), Some(EngineError::NotPending { .. })));

        db.delete_leave_as_admin(&leave.id, &user("boss")).unwrap();
        assert!(db.get_leave(&leave.id).unwrap().is_none());
    }

    #[test]
    fn only_requester_may_cancel() {
        let mut db = setup();
        let leave = db
            .apply_leave_at(app(LeaveType::Sick, date(2025, 3, 3), date(2025, 3, 4)), now())
            .unwrap();
        let err = db.cancel_leave(&leave.id, &user("mallory")).unwrap_err();
        assert!(matches!(err.engine(), Some(EngineError::Forbidden { .. })));

        db.cancel_leave(&leave.id, &user("alice")).unwrap();
        assert!(db.list_leaves(None).unwrap().is_empty());
    }
}
