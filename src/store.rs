//! The seam between the planner and wherever tasks and schedule rows live.
//!
//! Two implementations ship with the crate: [`Database`] for in-process use
//! and [`StoreClient`](crate::client::StoreClient) for talking to a `wkpl serve`
//! instance over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Database, Rejection};
use crate::models::*;

/// Store errors, shared by the local and HTTP implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Operations the planner needs from the external store.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Tasks in the registry. Soft-deleted tasks are included only when asked.
    async fn list_tasks(&self, include_deleted: bool) -> StoreResult<Vec<Task>>;

    async fn create_task(&self, input: &CreateTaskInput) -> StoreResult<Task>;

    async fn update_task(&self, id: Uuid, input: &UpdateTaskInput) -> StoreResult<Task>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;

    async fn soft_delete_task(&self, id: Uuid) -> StoreResult<()>;

    async fn list_schedule_rows(&self) -> StoreResult<Vec<ScheduleRow>>;

    /// Replace every stored row with `rows` in one atomic write.
    async fn replace_schedule(&self, rows: &[NewScheduleRow]) -> StoreResult<Vec<ScheduleRow>>;

    async fn set_completed(&self, row_id: Uuid, completed: bool) -> StoreResult<()>;

    async fn move_hours(&self, input: &MoveHoursInput) -> StoreResult<()>;

    async fn weekly_progress(&self) -> StoreResult<WeeklyProgress>;
}

/// Map a database-layer error onto the store taxonomy.
fn store_error(e: anyhow::Error) -> StoreError {
    match e.downcast_ref::<Rejection>() {
        Some(rejection) if rejection.is_not_found() => StoreError::NotFound(rejection.to_string()),
        Some(rejection) => StoreError::BadRequest(rejection.to_string()),
        None => StoreError::Database(format!("{:#}", e)),
    }
}

fn task_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("Task {} not found", id))
}

#[async_trait]
impl ScheduleStore for Database {
    async fn list_tasks(&self, include_deleted: bool) -> StoreResult<Vec<Task>> {
        Database::list_tasks(self, include_deleted).map_err(store_error)
    }

    async fn create_task(&self, input: &CreateTaskInput) -> StoreResult<Task> {
        Database::create_task(self, input.clone()).map_err(store_error)
    }

    async fn update_task(&self, id: Uuid, input: &UpdateTaskInput) -> StoreResult<Task> {
        Database::update_task(self, id, input.clone())
            .map_err(store_error)?
            .ok_or_else(|| task_not_found(id))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        if Database::delete_task(self, id).map_err(store_error)? {
            Ok(())
        } else {
            Err(task_not_found(id))
        }
    }

    async fn soft_delete_task(&self, id: Uuid) -> StoreResult<()> {
        if Database::soft_delete_task(self, id).map_err(store_error)? {
            Ok(())
        } else {
            Err(task_not_found(id))
        }
    }

    async fn list_schedule_rows(&self) -> StoreResult<Vec<ScheduleRow>> {
        Database::list_schedule_rows(self).map_err(store_error)
    }

    async fn replace_schedule(&self, rows: &[NewScheduleRow]) -> StoreResult<Vec<ScheduleRow>> {
        Database::replace_schedule(self, rows).map_err(store_error)
    }

    async fn set_completed(&self, row_id: Uuid, completed: bool) -> StoreResult<()> {
        if Database::set_completed(self, row_id, completed).map_err(store_error)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!(
                "Schedule entry {} not found",
                row_id
            )))
        }
    }

    async fn move_hours(&self, input: &MoveHoursInput) -> StoreResult<()> {
        Database::move_hours(self, input).map_err(store_error)
    }

    async fn weekly_progress(&self) -> StoreResult<WeeklyProgress> {
        Database::weekly_progress(self).map_err(store_error)
    }
}
