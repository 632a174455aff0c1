//! Tasks: capacity planning on create/update and cascading deletion.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use wt_core::capacity::{check_leave_conflicts, plan_capacity};
use wt_core::task::normalize_assignees;
use wt_core::{
    Assignee, BusinessCalendar, CapacityPlan, EngineError, LogType, NewTask, Progress, ProjectCode,
    Task, TaskId, TaskPatch, TaskStatus, UserId,
};

use crate::employees::require_employees;
use crate::leaves::load_approved_leaves_in;
use crate::{Database, DbError, format_date, format_timestamp, parse_col, write_tx};

const TASK_COLUMNS: &str = "id, title, project_code, start_date, end_date, priority, \
                            estimated_hours, allocated_hours, status, created_at, updated_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_col(row, 0)?,
        title: row.get(1)?,
        project_code: parse_col(row, 2)?,
        assignees: Vec::new(),
        start: parse_col(row, 3)?,
        end: parse_col(row, 4)?,
        priority: parse_col(row, 5)?,
        estimated_hours: row.get(6)?,
        allocated_hours: row.get(7)?,
        status: parse_col(row, 8)?,
        created_at: parse_col(row, 9)?,
        updated_at: parse_col(row, 10)?,
    })
}

fn load_assignees(conn: &Connection, task: &TaskId) -> Result<Vec<Assignee>, DbError> {
    let mut stmt = conn.prepare(
        "
        SELECT user_id, consumed_minutes
        FROM task_assignees
        WHERE task_id = ?
        ORDER BY position ASC
        ",
    )?;
    let rows = stmt.query_map([task.as_str()], |row| {
        Ok(Assignee {
            user: parse_col(row, 0)?,
            consumed_minutes: row.get(1)?,
        })
    })?;
    let mut assignees = Vec::new();
    for row in rows {
        assignees.push(row?);
    }
    Ok(assignees)
}

pub(crate) fn load_task(conn: &Connection, id: &TaskId) -> Result<Option<Task>, DbError> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
            [id.as_str()],
            task_from_row,
        )
        .optional()?;
    let Some(mut task) = task else {
        return Ok(None);
    };
    task.assignees = load_assignees(conn, &task.id)?;
    Ok(Some(task))
}

pub(crate) fn require_task(conn: &Connection, id: &TaskId) -> Result<Task, DbError> {
    Ok(load_task(conn, id)?.ok_or_else(|| EngineError::not_found("task", id.as_str()))?)
}

fn project_code_taken(conn: &Connection, code: &ProjectCode) -> Result<bool, DbError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM tasks WHERE project_code = ?",
            [code.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(existing.is_some())
}

/// Runs leave-conflict and capacity planning for a proposed window.
fn plan_window(
    conn: &Connection,
    calendar: &BusinessCalendar,
    assignees: &[UserId],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CapacityPlan, DbError> {
    if start > end {
        return Err(EngineError::invalid_range(start, end).into());
    }
    if assignees.is_empty() {
        return Err(EngineError::NoAssignees.into());
    }
    let leaves = load_approved_leaves_in(conn, assignees, start, end)?;
    check_leave_conflicts(assignees, &leaves, start, end)?;
    let employees = require_employees(conn, assignees)?;
    Ok(plan_capacity(calendar, start, end, &employees)?)
}

fn insert_task_row(conn: &Connection, task: &Task) -> Result<(), DbError> {
    conn.execute(
        &format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            task.id.as_str(),
            task.title,
            task.project_code.as_str(),
            format_date(task.start),
            format_date(task.end),
            task.priority.as_str(),
            task.estimated_hours,
            task.allocated_hours,
            task.status.as_str(),
            format_timestamp(task.created_at),
            format_timestamp(task.updated_at),
        ],
    )?;
    Ok(())
}

fn write_assignees(conn: &Connection, task: &Task) -> Result<(), DbError> {
    conn.execute(
        "DELETE FROM task_assignees WHERE task_id = ?",
        [task.id.as_str()],
    )?;
    let mut stmt = conn.prepare(
        "
        INSERT INTO task_assignees (task_id, user_id, position, consumed_minutes)
        VALUES (?, ?, ?, ?)
        ",
    )?;
    for (position, assignee) in task.assignees.iter().enumerate() {
        stmt.execute(params![
            task.id.as_str(),
            assignee.user.as_str(),
            i64::try_from(position).unwrap_or(i64::MAX),
            assignee.consumed_minutes,
        ])?;
    }
    Ok(())
}

impl Database {
    /// Plans and stores a new task in `Pending` status.
    pub fn create_task(&mut self, new: NewTask) -> Result<Task, DbError> {
        self.create_task_at(new, Utc::now())
    }

    pub fn create_task_at(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<Task, DbError> {
        let calendar = self.calendar()?;
        let tx = write_tx(&mut self.conn)?;

        if project_code_taken(&tx, &new.project_code)? {
            return Err(EngineError::DuplicateProjectCode(new.project_code).into());
        }
        let assignees = normalize_assignees(new.assignees);
        let plan = plan_window(&tx, &calendar, &assignees, new.start, new.end)?;

        let task = Task {
            id: TaskId::generate(),
            title: new.title,
            project_code: new.project_code,
            assignees: assignees
                .into_iter()
                .map(|user| Assignee {
                    user,
                    consumed_minutes: 0,
                })
                .collect(),
            start: new.start,
            end: new.end,
            priority: new.priority,
            estimated_hours: plan.estimated_hours,
            allocated_hours: plan.allocated_hours,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        insert_task_row(&tx, &task)?;
        write_assignees(&tx, &task)?;
        tx.commit()?;
        tracing::debug!(
            task = %task.id,
            code = %task.project_code,
            estimated = task.estimated_hours,
            allocated = task.allocated_hours,
            "task created"
        );
        Ok(task)
    }

    /// Applies a patch. Capacity is re-planned only when the assignees or a
    /// date change.
    pub fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, DbError> {
        self.update_task_at(id, patch, Utc::now())
    }

    pub fn update_task_at(
        &mut self,
        id: &TaskId,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task, DbError> {
        let calendar = self.calendar()?;
        let tx = write_tx(&mut self.conn)?;
        let mut task = require_task(&tx, id)?;

        if patch.touches_schedule() {
            let users = patch
                .assignees
                .map_or_else(|| task.assignee_ids(), normalize_assignees);
            let start = patch.start.unwrap_or(task.start);
            let end = patch.end.unwrap_or(task.end);
            let plan = plan_window(&tx, &calendar, &users, start, end)?;

            // Retained assignees keep their banked minutes.
            let previous = std::mem::take(&mut task.assignees);
            task.assignees = users
                .into_iter()
                .map(|user| {
                    let consumed_minutes = previous
                        .iter()
                        .find(|a| a.user == user)
                        .map_or(0, |a| a.consumed_minutes);
                    Assignee {
                        user,
                        consumed_minutes,
                    }
                })
                .collect();
            task.start = start;
            task.end = end;
            task.estimated_hours = plan.estimated_hours;
            task.allocated_hours = plan.allocated_hours;
            write_assignees(&tx, &task)?;
        }

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        task.updated_at = now;
        tx.execute(
            "
            UPDATE tasks SET
                title = ?, start_date = ?, end_date = ?, priority = ?,
                estimated_hours = ?, allocated_hours = ?, status = ?, updated_at = ?
            WHERE id = ?
            ",
            params![
                task.title,
                format_date(task.start),
                format_date(task.end),
                task.priority.as_str(),
                task.estimated_hours,
                task.allocated_hours,
                task.status.as_str(),
                format_timestamp(task.updated_at),
                task.id.as_str(),
            ],
        )?;
        tx.commit()?;
        tracing::debug!(task = %task.id, allocated = task.allocated_hours, "task updated");
        Ok(task)
    }

    /// Deletes a task together with its assignees and every time log that
    /// references it. All or nothing.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<(), DbError> {
        let tx = write_tx(&mut self.conn)?;
        require_task(&tx, id)?;
        let logs = tx.execute("DELETE FROM time_logs WHERE task_id = ?", [id.as_str()])?;
        tx.execute("DELETE FROM task_assignees WHERE task_id = ?", [id.as_str()])?;
        tx.execute("DELETE FROM tasks WHERE id = ?", [id.as_str()])?;
        tx.commit()?;
        tracing::debug!(task = %id, logs, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, id: &TaskId) -> Result<Option<Task>, DbError> {
        load_task(&self.conn, id)
    }

    /// Lists tasks ordered by start date, optionally only those assigned to
    /// `assignee`.
    pub fn list_tasks(&self, assignee: Option<&UserId>) -> Result<Vec<Task>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE ?1 IS NULL
               OR id IN (SELECT task_id FROM task_assignees WHERE user_id = ?1)
            ORDER BY start_date ASC, project_code ASC
            "
        ))?;
        let rows = stmt.query_map([assignee.map(UserId::as_str)], task_from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            let mut task = row?;
            task.assignees = load_assignees(&self.conn, &task.id)?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    /// Work consumed on a task relative to its allocation.
    ///
    /// Only work logs count; a log stopped or paused mid-break is excluded.
    pub fn task_progress(&self, id: &TaskId) -> Result<Progress, DbError> {
        let task = require_task(&self.conn, id)?;
        let consumed_seconds: i64 = self.conn.query_row(
            "
            SELECT COALESCE(SUM(duration_seconds), 0)
            FROM time_logs
            WHERE task_id = ? AND log_type = ?
            ",
            params![id.as_str(), LogType::Work.as_str()],
            |row| row.get(0),
        )?;
        Ok(Progress {
            consumed_seconds,
            allocated_hours: task.allocated_hours,
        })
    }
}
