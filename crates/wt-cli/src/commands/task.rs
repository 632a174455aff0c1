//! Task planning commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use wt_core::{NewTask, Progress, Task, TaskId, TaskPatch, TaskStatus, UserId};
use wt_db::Database;

use super::util::{assignee_names, format_duration, write_json};
use crate::TaskAction;

const TITLE_WIDTH: usize = 24;

#[derive(Debug, Serialize)]
struct ProgressJson {
    #[serde(flatten)]
    progress: Progress,
    percent: u8,
}

#[derive(Debug, Serialize)]
struct TaskJson<'a> {
    #[serde(flatten)]
    task: &'a Task,
    effective_status: TaskStatus,
    progress: ProgressJson,
}

impl<'a> TaskJson<'a> {
    fn new(task: &'a Task, progress: Progress, today: NaiveDate) -> Self {
        Self {
            task,
            effective_status: task.effective_status(today),
            progress: ProgressJson {
                progress,
                percent: progress.percent(),
            },
        }
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: TaskAction,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        TaskAction::Create {
            title,
            code,
            assignees,
            start,
            end,
            priority,
        } => {
            let task = db.create_task_at(
                NewTask {
                    title,
                    project_code: code,
                    assignees,
                    start,
                    end,
                    priority,
                },
                now,
            )?;
            writeln!(
                writer,
                "Created task {} {}: {}h estimated, {}h allocated",
                task.project_code, task.id, task.estimated_hours, task.allocated_hours
            )?;
        }
        TaskAction::Update {
            id,
            title,
            assignees,
            start,
            end,
            priority,
            status,
        } => {
            let patch = TaskPatch {
                title,
                assignees,
                start,
                end,
                priority,
                status,
            };
            let task = db.update_task_at(&id, patch, now)?;
            writeln!(
                writer,
                "Updated task {}: {}h estimated, {}h allocated",
                task.project_code, task.estimated_hours, task.allocated_hours
            )?;
        }
        TaskAction::Delete { id } => {
            db.delete_task(&id)?;
            writeln!(writer, "Deleted task {id} and its time logs.")?;
        }
        TaskAction::Show { id, json } => show(writer, db, &id, json, now.date_naive())?,
        TaskAction::List { assignee, json } => {
            list(writer, db, assignee.as_ref(), json, now.date_naive())?;
        }
    }
    Ok(())
}

fn show<W: Write>(
    writer: &mut W,
    db: &Database,
    id: &TaskId,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let task = db
        .get_task(id)?
        .with_context(|| format!("task not found: {id}"))?;
    let progress = db.task_progress(id)?;

    if json {
        return write_json(writer, &TaskJson::new(&task, progress, today));
    }

    let assignees = task
        .assignees
        .iter()
        .map(|a| format!("{} ({})", a.user, format_duration(a.consumed_minutes * 60)))
        .collect::<Vec<_>>()
        .join(", ");

    writeln!(writer, "Task: {} ({})", task.title, task.project_code)?;
    writeln!(writer, "ID: {}", task.id)?;
    writeln!(writer, "Window: {} to {}", task.start, task.end)?;
    writeln!(writer, "Priority: {}", task.priority)?;
    writeln!(writer, "Status: {}", task.effective_status(today))?;
    writeln!(writer, "Assignees: {assignees}")?;
    writeln!(
        writer,
        "Hours: {} estimated, {} allocated",
        task.estimated_hours, task.allocated_hours
    )?;
    writeln!(
        writer,
        "Progress: {} of {}h ({}%)",
        format_duration(progress.consumed_seconds),
        task.allocated_hours,
        progress.percent()
    )?;
    Ok(())
}

fn truncate_title(title: &str) -> String {
    // Truncate by characters, not bytes, to avoid panics on multi-byte UTF-8
    if title.chars().count() > TITLE_WIDTH {
        format!("{}...", title.chars().take(TITLE_WIDTH - 3).collect::<String>())
    } else {
        title.to_string()
    }
}

fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    assignee: Option<&UserId>,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let tasks = db.list_tasks(assignee)?;
    let mut rows = Vec::with_capacity(tasks.len());
    for task in &tasks {
        rows.push(TaskJson::new(task, db.task_progress(&task.id)?, today));
    }

    if json {
        return write_json(writer, &rows);
    }
    if rows.is_empty() {
        writeln!(writer, "No tasks.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<10}  {:<24}  {:<10}  {:<10}  {:<11}  {:>5}  {:>4}  {:<16}  ID",
        "Code", "Title", "Start", "End", "Status", "Alloc", "Done", "Assignees"
    )?;
    for row in rows {
        let task = row.task;
        let allocated = format!("{}h", task.allocated_hours);
        let done = format!("{}%", row.progress.percent);
        writeln!(
            writer,
            "{:<10}  {:<24}  {:<10}  {:<10}  {:<11}  {:>5}  {:>4}  {:<16}  {}",
            task.project_code.as_str(),
            truncate_title(&task.title),
            task.start.to_string(),
            task.end.to_string(),
            row.effective_status.as_str(),
            allocated,
            done,
            assignee_names(&task.assignees),
            task.id
        )?;
    }
    Ok(())
}
