/// Task management REST API endpoints
///
/// Creating a task also fires the `task_created` trigger so that workflows can
/// react to it (assign, notify, escalate).

use crate::{
    api::{ApiJson, AppState},
    error::{Error, Result},
    runtime::ExecutionOutcome,
    task::{NewTask, Task, TaskFilter, TaskStore, TaskUpdate},
    workflow::EventContext,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

/// Trigger type fired after every successful task creation
pub const TASK_CREATED: &str = "task_created";

/// Create task management routes
pub fn create_task_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/stats/summary", get(task_stats))
        .route("/api/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
}

/// List tasks, newest first
///
/// GET /api/tasks?status=&priority=&assigned_to=&limit=
async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Value>> {
    let tasks = state.tasks.list(&filter).await?;
    Ok(Json(json!({ "success": true, "count": tasks.len(), "data": tasks })))
}

/// GET /api/tasks/stats/summary
async fn task_stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let stats = state.tasks.stats().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

/// GET /api/tasks/{id}
async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let task = state.tasks.get(&id).await?.ok_or(Error::TaskNotFound(id))?;
    Ok(Json(json!({ "success": true, "data": task })))
}

/// Create a task and run `task_created` workflows
///
/// POST /api/tasks
/// Returns 201 with the task as it stands after the workflows ran, plus the
/// per-workflow outcomes.
async fn create_task(
    State(state): State<AppState>,
    ApiJson(new_task): ApiJson<NewTask>,
) -> Result<(StatusCode, Json<Value>)> {
    let task = state.tasks.create(new_task).await?;

    let outcomes = match state.engine.trigger_workflows(TASK_CREATED, &task_created_context(&task)).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            // The task itself is committed; report the trigger failure only in logs
            tracing::error!("❌ Failed to run {} workflows for task {}: {}", TASK_CREATED, task.id, e);
            Vec::<ExecutionOutcome>::new()
        }
    };

    let task = if outcomes.is_empty() {
        task
    } else {
        state.tasks.get(&task.id).await?.unwrap_or(task)
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": task, "workflows": outcomes })),
    ))
}

/// PUT /api/tasks/{id}
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<TaskUpdate>,
) -> Result<Json<Value>> {
    let task = state.tasks.update(&id, update).await?;
    Ok(Json(json!({ "success": true, "data": task })))
}

/// DELETE /api/tasks/{id}
async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    state.tasks.delete(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Task deleted successfully" })))
}

fn task_created_context(task: &Task) -> EventContext {
    let mut context = EventContext::new()
        .with("task_id", task.id.clone())
        .with("title", task.title.clone())
        .with("status", task.status.as_str())
        .with("priority", task.priority.as_str());
    context.insert_opt("assigned_to", task.assigned_to.clone());
    context
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{empty_request, json_request, send, state};
    use crate::workflow::NewWorkflow;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_fetch_task() {
        let state = state().await;

        let (status, body) = send(
            &state,
            json_request("POST", "/api/tasks", json!({ "title": "Write docs", "priority": "low", "tags": ["docs"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("pending"));
        assert_eq!(body["workflows"], json!([]));
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&state, empty_request("GET", &format!("/api/tasks/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], json!("Write docs"));
        assert_eq!(body["data"]["tags"], json!(["docs"]));
    }

    #[tokio::test]
    async fn blank_title_is_bad_request() {
        let state = state().await;
        let (status, body) = send(&state, json_request("POST", "/api/tasks", json!({ "title": "  " }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error_kind"], json!("validation_error"));
    }

    #[tokio::test]
    async fn undecodable_task_body_uses_error_envelope() {
        let state = state().await;
        let (_, body) = send(&state, json_request("POST", "/api/tasks", json!({ "title": "Keep" }))).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&state, json_request("PUT", &format!("/api/tasks/{}", id), json!({ "status": "done" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error_kind"], json!("validation_error"));

        let (status, body) = send(
            &state,
            json_request("POST", "/api/tasks", json!({ "title": "x", "priority": "critical" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_kind"], json!("validation_error"));

        let (_, body) = send(&state, empty_request("GET", &format!("/api/tasks/{}", id))).await;
        assert_eq!(body["data"]["status"], json!("pending"));
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let state = state().await;

        let (status, _) = send(&state, empty_request("GET", "/api/tasks/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&state, json_request("PUT", "/api/tasks/ghost", json!({ "status": "completed" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, empty_request("DELETE", "/api/tasks/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_kind"], json!("task_not_found"));
    }

    #[tokio::test]
    async fn list_filters_and_stats() {
        let state = state().await;
        for (title, priority) in [("a", "high"), ("b", "low"), ("c", "high")] {
            send(&state, json_request("POST", "/api/tasks", json!({ "title": title, "priority": priority }))).await;
        }

        let (status, body) = send(&state, empty_request("GET", "/api/tasks?priority=high")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(2));
        assert_eq!(body["data"][0]["title"], json!("c"));

        let (_, body) = send(&state, empty_request("GET", "/api/tasks?limit=1")).await;
        assert_eq!(body["count"], json!(1));

        let (status, body) = send(&state, empty_request("GET", "/api/tasks/stats/summary")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], json!(3));
        assert_eq!(body["data"]["by_priority"]["high"], json!(2));
    }

    #[tokio::test]
    async fn creating_a_task_runs_task_created_workflows() {
        let state = state().await;
        state
            .workflows
            .create_workflow(NewWorkflow {
                name: "Urgent goes to on-call".into(),
                trigger_type: "task_created".into(),
                trigger_config: json!({
                    "condition": { "field": "priority", "operator": "equals", "value": "urgent" }
                })
                .as_object()
                .cloned()
                .unwrap(),
                action_type: "assign_task".into(),
                action_config: json!({ "task_id": "{{task_id}}", "assignee": "on-call" })
                    .as_object()
                    .cloned()
                    .unwrap(),
                ..NewWorkflow::default()
            })
            .await
            .unwrap();

        let (status, body) = send(
            &state,
            json_request("POST", "/api/tasks", json!({ "title": "Database down", "priority": "urgent" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["assigned_to"], json!("on-call"));
        assert_eq!(body["workflows"][0]["success"], json!(true));
    }

    #[tokio::test]
    async fn update_then_delete_task() {
        let state = state().await;
        let (_, body) = send(&state, json_request("POST", "/api/tasks", json!({ "title": "Ship", "assigned_to": "kim" }))).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &state,
            json_request("PUT", &format!("/api/tasks/{}", id), json!({ "status": "in_progress", "assigned_to": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("in_progress"));
        assert_eq!(body["data"]["assigned_to"], json!(null));

        let (status, body) = send(&state, empty_request("DELETE", &format!("/api/tasks/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }
}
