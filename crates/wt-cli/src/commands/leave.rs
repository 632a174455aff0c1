//! Leave requests: apply, edit, review and balances.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use wt_core::{Leave, LeaveApplication, LeavePatch, UserId};
use wt_db::Database;

use super::employee::BalanceJson;
use super::util::{format_days, write_json};
use crate::LeaveAction;

#[derive(Debug, Serialize)]
struct LeaveJson<'a> {
    #[serde(flatten)]
    leave: &'a Leave,
    business_days: u32,
}

#[derive(Debug, Serialize)]
struct UserBalanceJson<'a> {
    user: &'a UserId,
    #[serde(flatten)]
    balance: BalanceJson,
}

fn describe(db: &Database, leave: &Leave) -> Result<String> {
    let days = db.leave_days(leave)?;
    Ok(format!(
        "{} {} to {} ({} business day{}, {})",
        leave.leave_type,
        leave.start,
        leave.end,
        days,
        if days == 1 { "" } else { "s" },
        leave.status
    ))
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: LeaveAction,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        LeaveAction::Apply {
            user,
            leave_type,
            start,
            end,
            reason,
        } => {
            let leave = db.apply_leave_at(
                LeaveApplication {
                    user,
                    leave_type,
                    start,
                    end,
                    reason,
                },
                now,
            )?;
            writeln!(writer, "Leave {} submitted: {}", leave.id, describe(db, &leave)?)?;
        }
        LeaveAction::Edit {
            id,
            user,
            leave_type,
            start,
            end,
            reason,
        } => {
            let patch = LeavePatch {
                leave_type,
                start,
                end,
                reason,
            };
            let leave = db.edit_leave_at(&id, &user, &patch, now.date_naive())?;
            writeln!(writer, "Leave {} updated: {}", leave.id, describe(db, &leave)?)?;
        }
        LeaveAction::Cancel { id, user } => {
            db.cancel_leave(&id, &user)?;
            writeln!(writer, "Leave {id} cancelled.")?;
        }
        LeaveAction::Process {
            id,
            decision,
            admin,
            comment,
        } => {
            let leave = db.process_leave(&id, &admin, decision.into(), comment)?;
            writeln!(writer, "Leave {} {} by {admin}.", leave.id, leave.status)?;
        }
        LeaveAction::Delete { id, admin } => {
            db.delete_leave_as_admin(&id, &admin)?;
            writeln!(writer, "Leave {id} deleted.")?;
        }
        LeaveAction::Balance { user, json } => {
            let balance = db.leave_balance_at(&user, now.date_naive())?;
            if json {
                return write_json(
                    writer,
                    &UserBalanceJson {
                        user: &user,
                        balance: balance.into(),
                    },
                );
            }
            writeln!(
                writer,
                "{user}: {} earned, {} taken, {} remaining",
                format_days(balance.earned_days),
                balance.taken_days,
                format_days(balance.remaining_days())
            )?;
        }
        LeaveAction::List { user, json } => list(writer, db, user.as_ref(), json)?,
    }
    Ok(())
}

fn list<W: Write>(writer: &mut W, db: &Database, user: Option<&UserId>, json: bool) -> Result<()> {
    let leaves = db.list_leaves(user)?;
    let mut rows = Vec::with_capacity(leaves.len());
    for leave in &leaves {
        rows.push(LeaveJson {
            leave,
            business_days: db.leave_days(leave)?,
        });
    }

    if json {
        return write_json(writer, &rows);
    }
    if rows.is_empty() {
        writeln!(writer, "No leave requests.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<10}  {:<10}  {:<9}  {:<8}  {:>4}  {:<10}  ID",
        "Start", "End", "Type", "Status", "Days", "User"
    )?;
    for row in rows {
        let leave = row.leave;
        writeln!(
            writer,
            "{:<10}  {:<10}  {:<9}  {:<8}  {:>4}  {:<10}  {}",
            leave.start.to_string(),
            leave.end.to_string(),
            leave.leave_type.as_str(),
            leave.status.as_str(),
            row.business_days,
            leave.user.as_str(),
            leave.id
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, TimeZone};
    use insta::assert_snapshot;
    use wt_core::{Employee, LeaveId, LeaveType};

    use crate::DecisionArg;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
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

    fn exec(db: &mut Database, action: LeaveAction) -> Result<String> {
        let mut output = Vec::new();
        run(&mut output, db, action, now())?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn apply(db: &mut Database, leave_type: LeaveType, start: NaiveDate, end: NaiveDate) -> Result<String> {
        exec(
            db,
            LeaveAction::Apply {
                user: user("alice"),
                leave_type,
                start,
                end,
                reason: "trip".to_string(),
            },
        )
    }

    fn only_leave_id(db: &Database) -> LeaveId {
        let leaves = db.list_leaves(None).unwrap();
        assert_eq!(leaves.len(), 1);
        leaves[0].id.clone()
    }

    #[test]
    fn apply_approve_and_check_balance() {
        let mut db = setup();
        let output = apply(&mut db, LeaveType::Annual, date(2025, 3, 10), date(2025, 3, 12)).unwrap();
        let id = only_leave_id(&db);
        let output = output.replace(id.as_str(), "[ID]");
        assert_snapshot!(output.trim_end(), @"Leave [ID] submitted: annual 2025-03-10 to 2025-03-12 (3 business days, pending)");

        let output = exec(
            &mut db,
            LeaveAction::Process {
                id: id.clone(),
                decision: DecisionArg::Approve,
                admin: user("boss"),
                comment: Some("enjoy".to_string()),
            },
        )
        .unwrap()
        .replace(id.as_str(), "[ID]");
        assert_snapshot!(output.trim_end(), @"Leave [ID] approved by boss.");

        let output = exec(
            &mut db,
            LeaveAction::Balance {
                user: user("alice"),
                json: false,
            },
        )
        .unwrap();
        assert_snapshot!(output.trim_end(), @"alice: 14.0 earned, 3 taken, 11.0 remaining");
    }

    #[test]
    fn overlapping_application_is_rejected() {
        let mut db = setup();
        apply(&mut db, LeaveType::Sick, date(2025, 3, 11), date(2025, 3, 14)).unwrap();
        let err = apply(&mut db, LeaveType::Personal, date(2025, 3, 10), date(2025, 3, 12)).unwrap_err();
        assert!(err.to_string().starts_with("leave overlaps existing request"));
        apply(&mut db, LeaveType::Personal, date(2025, 3, 5), date(2025, 3, 7)).unwrap();
        assert_eq!(db.list_leaves(None).unwrap().len(), 2);
    }

    #[test]
    fn weekend_only_application_is_rejected() {
        let mut db = setup();
        let err = apply(&mut db, LeaveType::Sick, date(2025, 3, 8), date(2025, 3, 9)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no working days between 2025-03-08 and 2025-03-09"
        );
    }

    #[test]
    fn edit_cancel_and_list() {
        let mut db = setup();
        apply(&mut db, LeaveType::Annual, date(2025, 3, 10), date(2025, 3, 12)).unwrap();
        let id = only_leave_id(&db);

        let output = exec(
            &mut db,
            LeaveAction::Edit {
                id: id.clone(),
                user: user("alice"),
                leave_type: None,
                start: None,
                end: Some(date(2025, 3, 10)),
                reason: None,
            },
        )
        .unwrap()
        .replace(id.as_str(), "[ID]");
        assert_snapshot!(output.trim_end(), @"Leave [ID] updated: annual 2025-03-10 to 2025-03-10 (1 business day, pending)");

        let listed = exec(
            &mut db,
            LeaveAction::List {
                user: None,
                json: false,
            },
        )
        .unwrap()
        .replace(id.as_str(), "[ID]");
        assert_snapshot!(listed.trim_end(), @r"
        Start       End         Type       Status    Days  User        ID
        2025-03-10  2025-03-10  annual     pending      1  alice       [ID]
        ");

        let err = exec(
            &mut db,
            LeaveAction::Cancel {
                id: id.clone(),
                user: user("mallory"),
            },
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("forbidden"));

        exec(
            &mut db,
            LeaveAction::Cancel {
                id,
                user: user("alice"),
            },
        )
        .unwrap();
        let listed = exec(
            &mut db,
            LeaveAction::List {
                user: Some(user("alice")),
                json: false,
            },
        )
        .unwrap();
        assert_snapshot!(listed.trim_end(), @"No leave requests.");
    }

    #[test]
    fn admin_delete_and_json_list() {
        let mut db = setup();
        apply(&mut db, LeaveType::Unpaid, date(2025, 3, 3), date(2025, 3, 4)).unwrap();
        let id = only_leave_id(&db);

        let listed = exec(
            &mut db,
            LeaveAction::List {
                user: None,
                json: true,
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&listed).unwrap();
        assert_eq!(value[0]["leave_type"], "unpaid");
        assert_eq!(value[0]["business_days"], 2);
        assert_eq!(value[0]["status"], "pending");

        exec(
            &mut db,
            LeaveAction::Delete {
                id: id.clone(),
                admin: user("boss"),
            },
        )
        .unwrap();
        assert!(db.get_leave(&id).unwrap().is_none());
    }
}
