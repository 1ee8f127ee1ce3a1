mod schema;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

/// Requests the database refuses on semantic grounds, as opposed to I/O
/// failures. Callers downcast to this to decide between 4xx and 5xx.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    Field(#[from] TaskFieldError),

    #[error("invalid task: an active task titled '{0}' already exists")]
    DuplicateTitle(String),

    #[error("Task {0} not found")]
    UnknownTask(Uuid),

    #[error("Schedule entry for task {task} on {day} not found")]
    MissingEntry { task: Uuid, day: Weekday },

    #[error("invalid hours: {0}")]
    InvalidHours(String),

    #[error("Task {task} appears more than once on {day}")]
    DuplicateEntry { task: Uuid, day: Weekday },
}

impl Rejection {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownTask(_) | Self::MissingEntry { .. })
    }
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const TASK_COLUMNS: &str =
    "id, title, duration_hours, spread_days, is_short_task, is_deleted, created_at";

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "weekplan")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("weekplan.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn list_tasks(&self, include_deleted: bool) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let sql = if include_deleted {
            format!("SELECT {} FROM tasks ORDER BY created_at, title", TASK_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM tasks WHERE is_deleted = 0 ORDER BY created_at, title",
                TASK_COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let task = conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS),
                [id.to_string()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        let title = input.title.trim().to_string();
        let spread_days = input.spread_days.unwrap_or(DEFAULT_SPREAD_DAYS);
        check_task_fields(&title, input.duration_hours, spread_days).map_err(Rejection::from)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        ensure_title_available(&conn, &title, None)?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tasks (id, title, duration_hours, spread_days, is_short_task, is_deleted, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
            (
                id.to_string(),
                &title,
                input.duration_hours,
                spread_days,
                input.is_short_task,
                now.to_rfc3339(),
            ),
        )?;

        tracing::debug!("Created task {} ({})", title, id);

        Ok(Task {
            id,
            title,
            duration_hours: input.duration_hours,
            spread_days,
            is_short_task: input.is_short_task,
            is_deleted: false,
            created_at: now,
        })
    }

    pub fn update_task(&self, id: Uuid, input: UpdateTaskInput) -> Result<Option<Task>> {
        let Some(existing) = self.get_task(id)? else {
            return Ok(None);
        };

        let title = input
            .title
            .map(|t| t.trim().to_string())
            .unwrap_or(existing.title);
        let duration_hours = input.duration_hours.unwrap_or(existing.duration_hours);
        let spread_days = input.spread_days.unwrap_or(existing.spread_days);
        let is_short_task = input.is_short_task.unwrap_or(existing.is_short_task);
        check_task_fields(&title, duration_hours, spread_days).map_err(Rejection::from)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        if !existing.is_deleted {
            ensure_title_available(&conn, &title, Some(id))?;
        }

        conn.execute(
            "UPDATE tasks SET title = ?, duration_hours = ?, spread_days = ?, is_short_task = ? WHERE id = ?",
            (
                &title,
                duration_hours,
                spread_days,
                is_short_task,
                id.to_string(),
            ),
        )?;

        Ok(Some(Task {
            id,
            title,
            duration_hours,
            spread_days,
            is_short_task,
            is_deleted: existing.is_deleted,
            created_at: existing.created_at,
        }))
    }

    /// Hard delete. The task's schedule rows go with it.
    pub fn delete_task(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM weekly_schedules WHERE task_id = ?",
            [id.to_string()],
        )?;
        let rows = tx.execute("DELETE FROM tasks WHERE id = ?", [id.to_string()])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    /// Mark a task finished. It stays listed but is skipped by future allocations.
    pub fn soft_delete_task(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE tasks SET is_deleted = 1 WHERE id = ?",
            [id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Weekly schedule operations
    // ============================================================

    pub fn list_schedule_rows(&self) -> Result<Vec<ScheduleRow>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, task_id, day, hours, completed FROM weekly_schedules ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map([], schedule_row_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Replace the stored week with `rows`.
    ///
    /// Runs in one transaction: either every previous row is superseded by
    /// the new batch, or nothing changes. Replaying the same batch therefore
    /// never double-allocates hours.
    pub fn replace_schedule(&self, rows: &[NewScheduleRow]) -> Result<Vec<ScheduleRow>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            // One row per (task, day): moves and completion address a single row.
            if !seen.insert((row.task, row.day)) {
                return Err(Rejection::DuplicateEntry {
                    task: row.task,
                    day: row.day,
                }
                .into());
            }
            if !row.hours.is_finite() || row.hours < 0.0 {
                return Err(Rejection::InvalidHours(format!(
                    "{} hours for task {} on {}",
                    row.hours, row.task, row.day
                ))
                .into());
            }
            let exists: i32 = tx.query_row(
                "SELECT COUNT(*) FROM tasks WHERE id = ?",
                [row.task.to_string()],
                |r| r.get(0),
            )?;
            if exists == 0 {
                return Err(Rejection::UnknownTask(row.task).into());
            }
        }

        let cleared = tx.execute("DELETE FROM weekly_schedules", [])?;

        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO weekly_schedules (id, task_id, day, hours, completed) VALUES (?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    row.task.to_string(),
                    row.day.as_str(),
                    row.hours,
                    row.completed,
                ),
            )?;
            created.push(ScheduleRow {
                id,
                task: row.task,
                day: row.day,
                hours: row.hours,
                completed: row.completed,
            });
        }

        tx.commit()?;
        tracing::info!(
            "Replaced weekly schedule: {} rows cleared, {} rows written",
            cleared,
            created.len()
        );

        Ok(created)
    }

    pub fn set_completed(&self, row_id: Uuid, completed: bool) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE weekly_schedules SET completed = ? WHERE id = ?",
            (completed, row_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    /// Shift `hours` of a task from `old_day` to `new_day`.
    ///
    /// The old row is deleted once it reaches zero; the new row is created
    /// if the task had nothing on `new_day` yet.
    pub fn move_hours(&self, input: &MoveHoursInput) -> Result<()> {
        if !input.hours.is_finite() || input.hours <= 0.0 {
            return Err(Rejection::InvalidHours(format!(
                "moved hours must be positive, got {}",
                input.hours
            ))
            .into());
        }
        if input.old_day == input.new_day {
            return Err(Rejection::InvalidHours(format!(
                "cannot move hours from {} onto itself",
                input.old_day
            ))
            .into());
        }

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let task_id = input.task_id.to_string();

        let task_exists: i32 = tx.query_row(
            "SELECT COUNT(*) FROM tasks WHERE id = ?",
            [&task_id],
            |r| r.get(0),
        )?;
        if task_exists == 0 {
            return Err(Rejection::UnknownTask(input.task_id).into());
        }

        let old: Option<(String, f64)> = tx
            .query_row(
                "SELECT id, hours FROM weekly_schedules WHERE task_id = ? AND day = ? ORDER BY rowid LIMIT 1",
                (&task_id, input.old_day.as_str()),
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((old_id, old_hours)) = old else {
            return Err(Rejection::MissingEntry {
                task: input.task_id,
                day: input.old_day,
            }
            .into());
        };

        if input.hours > old_hours + HOURS_EPSILON {
            return Err(Rejection::InvalidHours(format!(
                "cannot move {} hours, only {} allocated on {}",
                input.hours, old_hours, input.old_day
            ))
            .into());
        }

        let remaining = old_hours - input.hours;
        if remaining <= HOURS_EPSILON {
            tx.execute("DELETE FROM weekly_schedules WHERE id = ?", [&old_id])?;
        } else {
            tx.execute(
                "UPDATE weekly_schedules SET hours = ? WHERE id = ?",
                (remaining, &old_id),
            )?;
        }

        let updated = tx.execute(
            "UPDATE weekly_schedules SET hours = hours + ?
             WHERE id = (SELECT id FROM weekly_schedules WHERE task_id = ? AND day = ? ORDER BY rowid LIMIT 1)",
            (input.hours, &task_id, input.new_day.as_str()),
        )?;
        if updated == 0 {
            tx.execute(
                "INSERT INTO weekly_schedules (id, task_id, day, hours, completed) VALUES (?, ?, ?, ?, 0)",
                (
                    Uuid::new_v4().to_string(),
                    &task_id,
                    input.new_day.as_str(),
                    input.hours,
                ),
            )?;
        }

        tx.commit()?;
        tracing::debug!(
            "Moved {}h of task {} from {} to {}",
            input.hours,
            input.task_id,
            input.old_day,
            input.new_day
        );
        Ok(())
    }

    /// Completion flags per day for active tasks, keyed by task title.
    pub fn weekly_progress(&self) -> Result<WeeklyProgress> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT s.day, t.title, s.completed
             FROM weekly_schedules s JOIN tasks t ON t.id = s.task_id
             WHERE t.is_deleted = 0
             ORDER BY s.rowid",
        )?;

        let mut progress: WeeklyProgress = Weekday::ALL
            .into_iter()
            .map(|day| DayProgress {
                day,
                tasks: Default::default(),
            })
            .collect();

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let day = parse_weekday(row, 0)?;
            let title: String = row.get(1)?;
            let completed: bool = row.get(2)?;
            progress[day.index()].tasks.insert(title, completed);
        }

        Ok(progress)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Fails if another active task (other than `except`) already uses `title`.
fn ensure_title_available(conn: &Connection, title: &str, except: Option<Uuid>) -> Result<()> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE title = ? AND is_deleted = 0 AND id != ?",
        (title, except.map(|u| u.to_string()).unwrap_or_default()),
        |row| row.get(0),
    )?;
    if count > 0 {
        return Err(Rejection::DuplicateTitle(title.to_string()).into());
    }
    Ok(())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        duration_hours: row.get(2)?,
        spread_days: row.get(3)?,
        is_short_task: row.get(4)?,
        is_deleted: row.get(5)?,
        created_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn schedule_row_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleRow> {
    Ok(ScheduleRow {
        id: parse_uuid(row.get::<_, String>(0)?),
        task: parse_uuid(row.get::<_, String>(1)?),
        day: parse_weekday(row, 2)?,
        hours: row.get(3)?,
        completed: row.get(4)?,
    })
}

fn parse_weekday(row: &Row<'_>, idx: usize) -> rusqlite::Result<Weekday> {
    let raw: String = row.get(idx)?;
    Weekday::parse(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
