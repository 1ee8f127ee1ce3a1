use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::schedule::is_reserved_title;

/// Spread used when a task is created without one.
pub const DEFAULT_SPREAD_DAYS: u8 = 7;

/// A recurring commitment with a weekly hour budget.
///
/// The `title` doubles as the key inside a day's schedule, so titles are
/// unique among active (non-deleted) tasks. Soft-deleted tasks stay visible in
/// registry listings but are skipped by the allocator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    /// Total hours per week the task should receive.
    pub duration_hours: f64,
    /// Number of distinct days a long task is split over. Ignored for short tasks.
    pub spread_days: u8,
    /// Selects random sub-two-hour bursts instead of an even split.
    pub is_short_task: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// How a task's hours are placed across the week.
///
/// - `Long`: `duration_hours / spread_days` on each of `spread_days` distinct days
/// - `Short`: randomly sized bursts on random days
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Long,
    Short,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            _ => None,
        }
    }
}

/// Field-level problems with a task declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskFieldError {
    #[error("invalid task: title must not be empty")]
    EmptyTitle,

    #[error("invalid task: '{0}' is reserved for fixed daily allocations")]
    ReservedTitle(String),

    #[error("invalid task: duration must be a non-negative number of hours, got {0}")]
    Duration(f64),

    #[error("invalid task: spread_days must be between 1 and 7, got {0}")]
    SpreadDays(u8),

    #[error("invalid task: more than one active task is titled '{0}'")]
    DuplicateTitle(String),
}

/// Checks the fields every task must satisfy regardless of where it came from.
pub fn check_task_fields(
    title: &str,
    duration_hours: f64,
    spread_days: u8,
) -> Result<(), TaskFieldError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskFieldError::EmptyTitle);
    }
    if is_reserved_title(trimmed) {
        return Err(TaskFieldError::ReservedTitle(trimmed.to_string()));
    }
    if !duration_hours.is_finite() || duration_hours < 0.0 {
        return Err(TaskFieldError::Duration(duration_hours));
    }
    if !(1..=7).contains(&spread_days) {
        return Err(TaskFieldError::SpreadDays(spread_days));
    }
    Ok(())
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        if self.is_short_task {
            TaskKind::Short
        } else {
            TaskKind::Long
        }
    }

    pub fn check_fields(&self) -> Result<(), TaskFieldError> {
        check_task_fields(&self.title, self.duration_hours, self.spread_days)
    }

    /// Hours placed on each selected day for a long task.
    pub fn hours_per_day(&self) -> f64 {
        self.duration_hours / f64::from(self.spread_days.max(1))
    }
}

/// Input for declaring a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub duration_hours: f64,
    /// Defaults to seven days when omitted.
    #[serde(default)]
    pub spread_days: Option<u8>,
    #[serde(default)]
    pub is_short_task: bool,
}

impl CreateTaskInput {
    pub fn long(title: impl Into<String>, duration_hours: f64, spread_days: u8) -> Self {
        Self {
            title: title.into(),
            duration_hours,
            spread_days: Some(spread_days),
            is_short_task: false,
        }
    }

    pub fn short(title: impl Into<String>, duration_hours: f64) -> Self {
        Self {
            title: title.into(),
            duration_hours,
            spread_days: None,
            is_short_task: true,
        }
    }
}

/// Input for updating a task. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub duration_hours: Option<f64>,
    pub spread_days: Option<u8>,
    pub is_short_task: Option<bool>,
}
