/// HTTP API Layer
///
/// This module provides the REST API endpoints for task and workflow
/// management and for external event sources. It handles:
/// - Task CRUD, filtered listing and statistics
/// - Workflow CRUD, manual execution and trigger-by-type
/// - GitHub webhook signature verification and event mapping
///
/// Every response uses the `{ success, data | error }` JSON envelope.

use crate::{
    config::{Config, GithubConfig},
    error::Error,
    notification::SqliteNotificationSink,
    runtime::WorkflowEngine,
    task::SqliteTaskStore,
    workflow::WorkflowStorage,
};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;

// Task management endpoints
pub mod tasks;

// Workflow management, execution and trigger endpoints
pub mod workflows;

// GitHub webhook receiver
pub mod github;

// Re-export router builders
pub use github::create_github_routes;
pub use tasks::create_task_routes;
pub use workflows::create_workflow_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Task persistence, also used by the engine through `TaskStore`
    pub tasks: Arc<SqliteTaskStore>,
    /// Workflow persistence
    pub workflows: WorkflowStorage,
    /// Trigger matching and execution
    pub engine: Arc<WorkflowEngine>,
    /// Webhook secret settings
    pub github: GithubConfig,
}

impl AppState {
    /// Wire stores and engine over a single database pool
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let tasks = Arc::new(SqliteTaskStore::new(pool.clone()));
        let notifications = Arc::new(SqliteNotificationSink::new(pool.clone()));
        let workflows = WorkflowStorage::new(pool);
        let engine = WorkflowEngine::new(workflows.clone(), tasks.clone(), notifications, config.engine);

        Self {
            tasks,
            workflows,
            engine: Arc::new(engine),
            github: config.github.clone(),
        }
    }
}

/// All API routes, without state attached
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .merge(create_task_routes())
        .merge(create_workflow_routes())
        .merge(create_github_routes())
}

/// Decode a JSON request body; a blank body reads as `{}`
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> crate::error::Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) { b"{}".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| Error::Validation(format!("Invalid request body: {}", e)))
}

/// JSON body extractor that rejects with the API error envelope
///
/// Malformed JSON and fields that fail to deserialize (an unknown status,
/// a wrong type) answer 400 `validation_error` instead of axum's plain-text
/// rejection.
#[derive(Debug, Clone, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;
        parse_body(&body).map(ApiJson)
    }
}

impl Error {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("❌ Request failed: {}", self);
        } else {
            tracing::warn!("⚠️ Request rejected: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "error_kind": self.kind(),
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(Error::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::UnknownActionType("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::TaskNotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::WorkflowNotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Execution("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::CorruptRecord("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let encode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::Serialization(encode).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn request_bodies_decode_to_validation_errors() {
        let empty: serde_json::Map<String, serde_json::Value> = parse_body(b"  ").unwrap();
        assert!(empty.is_empty());

        let err = parse_body::<serde_json::Value>(b"{").unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.starts_with("Invalid request body")));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
