use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Database, Rejection};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a database error to a response.
///
/// Rejections carry messages written for the client and become 404 or 400.
/// Anything else is logged server-side and returned as a generic 500.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    if let Some(rejection) = e.downcast_ref::<Rejection>() {
        let status = if rejection.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        tracing::warn!("Rejected request: {}", rejection);
        return (status, rejection.to_string());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Tasks
// ============================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub include_deleted: bool,
    pub kind: Option<TaskKind>,
}

pub async fn list_tasks(
    State(db): State<Database>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let mut tasks = db
        .list_tasks(query.include_deleted)
        .map_err(internal_error)?;
    if let Some(kind) = query.kind {
        tasks.retain(|t| t.kind() == kind);
    }
    Ok(Json(tasks))
}

pub async fn get_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, (StatusCode, String)> {
    db.get_task(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

pub async fn create_task(
    State(db): State<Database>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    db.create_task(input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(internal_error)
}

pub async fn update_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, (StatusCode, String)> {
    db.update_task(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

pub async fn delete_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_task(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Task"))
    }
}

pub async fn soft_delete_task(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.soft_delete_task(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Task"))
    }
}

// ============================================================
// Schedules
// ============================================================

pub async fn list_schedules(
    State(db): State<Database>,
) -> Result<Json<Vec<ScheduleRow>>, (StatusCode, String)> {
    db.list_schedule_rows().map(Json).map_err(internal_error)
}

/// Replace the stored week with the submitted rows.
pub async fn create_bulk(
    State(db): State<Database>,
    Json(input): Json<BulkScheduleInput>,
) -> Result<(StatusCode, Json<Vec<ScheduleRow>>), (StatusCode, String)> {
    db.replace_schedule(&input.schedules)
        .map(|rows| (StatusCode::CREATED, Json(rows)))
        .map_err(internal_error)
}

async fn set_completed(
    db: &Database,
    id: Uuid,
    completed: bool,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.set_completed(id, completed).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Schedule entry"))
    }
}

pub async fn mark_complete(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    set_completed(&db, id, true).await
}

pub async fn mark_incomplete(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    set_completed(&db, id, false).await
}

pub async fn move_hours(
    State(db): State<Database>,
    Json(input): Json<MoveHoursInput>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.move_hours(&input)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(internal_error)
}

pub async fn weekly_progress(
    State(db): State<Database>,
) -> Result<Json<WeeklyProgress>, (StatusCode, String)> {
    db.weekly_progress().map(Json).map_err(internal_error)
}
