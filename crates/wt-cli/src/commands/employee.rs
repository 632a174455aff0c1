//! Employee reference data.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use wt_core::{Employee, LeaveBalance, UserId};
use wt_db::Database;

use super::util::{format_days, write_json};
use crate::EmployeeAction;

/// Leave balance as reported by `employee show` and `leave balance`.
#[derive(Debug, Serialize)]
pub struct BalanceJson {
    pub earned_days: f64,
    pub taken_days: u32,
    pub remaining_days: f64,
}

impl From<LeaveBalance> for BalanceJson {
    fn from(balance: LeaveBalance) -> Self {
        Self {
            earned_days: balance.earned_days,
            taken_days: balance.taken_days,
            remaining_days: balance.remaining_days(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmployeeJson<'a> {
    #[serde(flatten)]
    employee: &'a Employee,
    leave: BalanceJson,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: EmployeeAction,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        EmployeeAction::Set {
            user,
            joined,
            daily_limit,
        } => {
            let employee = Employee {
                user,
                joined_date: joined,
                daily_work_limit_hours: daily_limit,
            };
            db.upsert_employee(&employee)?;
            writeln!(
                writer,
                "Saved employee {} (joined {}, {:.1}h/day)",
                employee.user, employee.joined_date, employee.daily_work_limit_hours
            )?;
        }
        EmployeeAction::Show { user, json } => show(writer, db, &user, json, now)?,
    }
    Ok(())
}

fn show<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &UserId,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let employee = db
        .get_employee(user)?
        .with_context(|| format!("employee not found: {user}"))?;
    let balance = db.leave_balance_at(user, now.date_naive())?;

    if json {
        return write_json(
            writer,
            &EmployeeJson {
                employee: &employee,
                leave: balance.into(),
            },
        );
    }

    writeln!(writer, "Employee: {}", employee.user)?;
    writeln!(writer, "Joined: {}", employee.joined_date)?;
    writeln!(writer, "Daily limit: {:.1}h", employee.daily_work_limit_hours)?;
    writeln!(
        writer,
        "Annual leave: {} earned, {} taken, {} remaining",
        format_days(balance.earned_days),
        balance.taken_days,
        format_days(balance.remaining_days())
    )?;
    Ok(())
}
