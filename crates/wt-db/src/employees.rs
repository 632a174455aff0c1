//! Employee reference data.

use rusqlite::{Connection, OptionalExtension, params};
use wt_core::{Employee, EngineError, UserId};

use crate::{Database, DbError, format_date, parse_col};

pub(crate) fn load_employee(conn: &Connection, user: &UserId) -> Result<Option<Employee>, DbError> {
    let employee = conn
        .query_row(
            "
            SELECT user_id, joined_date, daily_work_limit_hours
            FROM employees
            WHERE user_id = ?
            ",
            [user.as_str()],
            |row| {
                Ok(Employee {
                    user: parse_col(row, 0)?,
                    joined_date: parse_col(row, 1)?,
                    daily_work_limit_hours: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(employee)
}

/// Loads every listed employee, failing on the first unknown user.
pub(crate) fn require_employees(
    conn: &Connection,
    users: &[UserId],
) -> Result<Vec<Employee>, DbError> {
    let mut employees = Vec::with_capacity(users.len());
    for user in users {
        let employee = load_employee(conn, user)?
            .ok_or_else(|| EngineError::not_found("employee", user.as_str()))?;
        employees.push(employee);
    }
    Ok(employees)
}

impl Database {
    /// Inserts or replaces an employee record.
    pub fn upsert_employee(&mut self, employee: &Employee) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO employees (user_id, joined_date, daily_work_limit_hours)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                joined_date = excluded.joined_date,
                daily_work_limit_hours = excluded.daily_work_limit_hours
            ",
            params![
                employee.user.as_str(),
                format_date(employee.joined_date),
                employee.daily_work_limit_hours
            ],
        )?;
        tracing::debug!(user = %employee.user, joined = %employee.joined_date, "employee saved");
        Ok(())
    }

    pub fn get_employee(&self, user: &UserId) -> Result<Option<Employee>, DbError> {
        load_employee(&self.conn, user)
    }

    /// Lists employees ordered by user ID.
    pub fn list_employees(&self) -> Result<Vec<Employee>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, joined_date, daily_work_limit_hours
            FROM employees
            ORDER BY user_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Employee {
                user: parse_col(row, 0)?,
                joined_date: parse_col(row, 1)?,
                daily_work_limit_hours: row.get(2)?,
            })
        })?;
        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?);
        }
        Ok(employees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    fn employee(name: &str, joined: NaiveDate) -> Employee {
        Employee {
            user: UserId::new(name).unwrap(),
            joined_date: joined,
            daily_work_limit_hours: 9.0,
        }
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let mut db = Database::open_in_memory().unwrap();
        let joined = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        db.upsert_employee(&employee("alice", joined)).unwrap();

        let mut updated = employee("alice", joined);
        updated.daily_work_limit_hours = 6.5;
        db.upsert_employee(&updated).unwrap();

        let stored = db.get_employee(&updated.user).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(db.list_employees().unwrap().len(), 1);
    }

    #[test]
    fn require_employees_reports_missing_user() {
        let mut db = Database::open_in_memory().unwrap();
        let joined = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        db.upsert_employee(&employee("alice", joined)).unwrap();

        let users = vec![UserId::new("alice").unwrap(), UserId::new("ghost").unwrap()];
        let err = require_employees(&db.conn, &users).unwrap_err();
        assert!(matches!(
            err.engine(),
            Some(EngineError::NotFound { entity: "employee", .. })
        ));
    }
}
