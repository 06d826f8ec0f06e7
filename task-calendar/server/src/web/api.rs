use std::sync::Arc;

use crate::task::{
    self, TaskRepositoryError,
    api::{CreateTaskJson, DeleteTaskResponse, TaskJson, TaskState, UpdateTaskJson},
};

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// JSON response for API errors.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        Self { error }
    }
}

/// Custom error type for JSON API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was missing required input or carried malformed input.
    #[error("{0}")]
    BadRequest(String),
    /// The referenced task does not exist.
    #[error("Task not found")]
    TaskNotFound,
    /// The store is still being prepared at startup.
    #[error("Database is not ready")]
    StoreNotReady,
    /// An infrastructure failure; only `message` reaches the client.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: TaskRepositoryError,
    },
}

impl ApiError {
    /// Maps a repository failure, using `message` as the client-facing text for storage errors.
    pub fn from_repository(err: TaskRepositoryError, message: &'static str) -> Self {
        match err {
            TaskRepositoryError::Validation(reason) => ApiError::BadRequest(reason),
            TaskRepositoryError::NotFound(_) => ApiError::TaskNotFound,
            source @ TaskRepositoryError::Storage(_) => ApiError::Internal { message, source },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TaskNotFound => StatusCode::NOT_FOUND,
            ApiError::StoreNotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { message, source } = &self {
            tracing::error!("{}: {}", message, source);
        }
        let status_code = self.status_code();
        (status_code, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        task::api::list_tasks_handler,
        task::api::list_tasks_by_date_handler,
        task::api::create_task_handler,
        task::api::update_task_handler,
        task::api::delete_task_handler,
    ),
    components(schemas(
        TaskJson,
        CreateTaskJson,
        UpdateTaskJson,
        DeleteTaskResponse,
        ErrorResponse
    )),
    tags((name = "Tasks", description = "Calendar task management"))
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(task_state: Arc<TaskState>) -> Router {
    let tasks_router = task::api::create_api_router(task_state);
    let api_routes = tasks_router.route(
        "/health",
        axum::routing::get(crate::web::health_check_handler),
    );
    Router::new().nest("/api", api_routes)
}
