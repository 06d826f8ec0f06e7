use crate::task::{CalendarDate, NewTask, Task, TaskChanges, TaskRepository};
use crate::web::api::{ApiError, ErrorResponse};
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use utoipa::ToSchema;
use uuid::Uuid;

const REQUIRED_FIELDS_MESSAGE: &str = "Title and date are required";
const DELETED_MESSAGE: &str = "Task deleted successfully";
const INVALID_DATE_MESSAGE: &str = "Date must be formatted as YYYY-MM-DD";

/// Shared handler state; the connection is filled in once the store is ready.
#[derive(Debug, Default)]
pub struct TaskState {
    db: OnceCell<DatabaseConnection>,
}

impl TaskState {
    /// State for a server whose store is still being prepared.
    pub fn pending() -> Self {
        Self::default()
    }

    /// State backed by a store that is already usable.
    pub fn ready(db: DatabaseConnection) -> Self {
        Self {
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Makes the store available to the task routes. Returns `false` if it already was.
    pub fn set_ready(&self, db: DatabaseConnection) -> bool {
        self.db.set(db).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.db.initialized()
    }

    fn connection(&self) -> Result<&DatabaseConnection, ApiError> {
        self.db.get().ok_or(ApiError::StoreNotReady)
    }
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier for the task
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Calendar day of the task
    #[schema(value_type = String, format = Date, example = "2024-03-15")]
    pub date: CalendarDate,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Time of the last change, refreshed on every update
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            date: task.date(),
            completed: task.completed(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Request payload for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskJson {
    #[schema(example = "Pay bills")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "2024-03-15")]
    pub date: Option<String>,
}

/// Request payload replacing the full state of a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskJson {
    pub title: Option<String>,
    /// Defaults to an empty description when omitted
    pub description: Option<String>,
    pub date: Option<String>,
    pub completed: Option<bool>,
}

/// API response confirming a deletion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteTaskResponse {
    pub message: String,
    pub task: TaskJson,
}

/// Handler for GET /api/tasks - Returns every task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "All tasks, latest day first", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Database is not ready", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let repository = TaskRepository::new(state.connection()?);
    let tasks = repository
        .list_all()
        .await
        .map_err(|err| ApiError::from_repository(err, "Failed to fetch tasks"))?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /api/tasks/{date} - Returns the tasks of one day.
///
/// A value that is not a `YYYY-MM-DD` date matches no task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/{date}",
    params(
        ("date" = String, Path, description = "Calendar day in YYYY-MM-DD form")
    ),
    responses(
        (status = 200, description = "Tasks of the day, newest first", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Database is not ready", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_by_date_handler(
    State(state): State<Arc<TaskState>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let Ok(date) = date.parse::<CalendarDate>() else {
        tracing::debug!("Ignoring malformed date {:?}", date);
        return Ok(Json(Vec::new()));
    };

    let repository = TaskRepository::new(state.connection()?);
    let tasks = repository
        .list_by_date(date)
        .await
        .map_err(|err| ApiError::from_repository(err, "Failed to fetch tasks"))?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for POST /api/tasks - Creates a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskJson,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Title or date missing or invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Database is not ready", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    payload: Result<Json<CreateTaskJson>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let payload = json_body(payload)?;
    let (Some(title), Some(date)) = (present(payload.title), present(payload.date)) else {
        return Err(ApiError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_string()));
    };

    let new_task = NewTask {
        title,
        description: payload.description,
        date: parse_date(&date)?,
    };

    let repository = TaskRepository::new(state.connection()?);
    let task = repository
        .create(new_task)
        .await
        .map_err(|err| ApiError::from_repository(err, "Failed to create task"))?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for PUT /api/tasks/{id} - Replaces the state of a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the task to update")
    ),
    request_body = UpdateTaskJson,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Required field missing or invalid", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Database is not ready", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskJson>, JsonRejection>,
) -> Result<Json<TaskJson>, ApiError> {
    let payload = json_body(payload)?;
    let (Some(title), Some(date)) = (present(payload.title), present(payload.date)) else {
        return Err(ApiError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_string()));
    };
    let Some(completed) = payload.completed else {
        return Err(ApiError::BadRequest("Completed flag is required".to_string()));
    };

    let changes = TaskChanges {
        title,
        description: payload.description.unwrap_or_default(),
        date: parse_date(&date)?,
        completed,
    };
    let id = parse_task_id(&id)?;

    let repository = TaskRepository::new(state.connection()?);
    let task = repository
        .update(id, changes)
        .await
        .map_err(|err| ApiError::from_repository(err, "Failed to update task"))?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /api/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the task to delete")
    ),
    responses(
        (status = 200, description = "Task deleted", body = DeleteTaskResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Database is not ready", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteTaskResponse>, ApiError> {
    let id = parse_task_id(&id)?;

    let repository = TaskRepository::new(state.connection()?);
    let task = repository
        .delete(id)
        .await
        .map_err(|err| ApiError::from_repository(err, "Failed to delete task"))?;
    Ok(Json(DeleteTaskResponse {
        message: DELETED_MESSAGE.to_string(),
        task: TaskJson::from(task),
    }))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{param}",
            get(list_tasks_by_date_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_date(value: &str) -> Result<CalendarDate, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(INVALID_DATE_MESSAGE.to_string()))
}

// Anything that is not a UUID cannot name a stored task.
fn parse_task_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::TaskNotFound)
}
