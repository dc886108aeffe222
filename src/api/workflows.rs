/// Workflow management REST API endpoints
///
/// Provides CRUD operations for workflow definitions plus the two execution
/// entry points: manual execution of one workflow and trigger-by-type.
/// The engine reads workflows from storage on every event, so changes apply
/// to the next event without a reload.

use crate::{
    api::{parse_body, ApiJson, AppState},
    error::{Error, Result},
    workflow::{EventContext, NewWorkflow, WorkflowUpdate},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Request body for execute and trigger endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ContextRequest {
    /// Event context; missing or `null` means an empty context
    #[serde(default)]
    pub context: Option<EventContext>,
}

/// Create workflow management routes
///
/// Sets up the REST API endpoints for workflow CRUD and execution.
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/api/workflows/{id}/execute", post(execute_workflow))
        .route("/api/workflows/trigger/{trigger_type}", post(trigger_workflows))
}

/// Parse an optional `{ "context": {...} }` body; an empty body is an empty context
fn parse_context(body: &Bytes) -> Result<EventContext> {
    let request: ContextRequest = parse_body(body)?;
    Ok(request.context.unwrap_or_default())
}

/// List all workflows
///
/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>> {
    let workflows = state.workflows.list_workflows().await?;
    Ok(Json(json!({ "success": true, "count": workflows.len(), "data": workflows })))
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "name": "...", "trigger_type": "...", "trigger_config": {...},
///         "action_type": "...", "action_config": {...}, "enabled": true }
async fn create_workflow(
    State(state): State<AppState>,
    ApiJson(new_workflow): ApiJson<NewWorkflow>,
) -> Result<(StatusCode, Json<Value>)> {
    let workflow = state.workflows.create_workflow(new_workflow).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": workflow }))))
}

/// Get a specific workflow by ID
///
/// GET /api/workflows/{id}
async fn get_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let workflow = state
        .workflows
        .get_workflow(&id)
        .await?
        .ok_or(Error::WorkflowNotFound(id))?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}

/// Update an existing workflow
///
/// PUT /api/workflows/{id}
/// Only the supplied fields change.
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<WorkflowUpdate>,
) -> Result<Json<Value>> {
    let workflow = state.workflows.update_workflow(&id, update).await?;
    Ok(Json(json!({ "success": true, "data": workflow })))
}

/// Delete a workflow
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    state.workflows.delete_workflow(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Workflow deleted successfully" })))
}

/// Execute one workflow with a caller-supplied context
///
/// POST /api/workflows/{id}/execute
/// Body: { "context": {...} }
/// Returns the execution outcome; a disabled or failing workflow still
/// answers 200 with `success: false`.
async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let context = parse_context(&body)?;
    let outcome = state.engine.execute_workflow(&id, &context).await?;
    Ok(Json(serde_json::to_value(&outcome)?))
}

/// Fire every enabled workflow listening on a trigger type
///
/// POST /api/workflows/trigger/{trigger_type}
/// Body: { "context": {...} }
async fn trigger_workflows(
    State(state): State<AppState>,
    Path(trigger_type): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let context = parse_context(&body)?;
    let results = state.engine.trigger_workflows(&trigger_type, &context).await?;
    Ok(Json(json!({ "success": true, "triggered": results.len(), "results": results })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{empty_request, json_request, send, state};

    fn notify_workflow(trigger_type: &str) -> Value {
        json!({
            "name": "Announce",
            "trigger_type": trigger_type,
            "action_type": "send_notification",
            "action_config": { "message": "Hello {{who}}" }
        })
    }

    #[test]
    fn context_body_variants() {
        assert!(parse_context(&Bytes::new()).unwrap().is_empty());
        assert!(parse_context(&Bytes::from_static(b"{}")).unwrap().is_empty());
        assert!(parse_context(&Bytes::from_static(b"{\"context\":null}")).unwrap().is_empty());
        let ctx = parse_context(&Bytes::from_static(b"{\"context\":{\"who\":\"ops\"}}")).unwrap();
        assert_eq!(ctx.get("who"), Some(&json!("ops")));
        assert!(matches!(parse_context(&Bytes::from_static(b"{")), Err(Error::Validation(_))));
        assert!(matches!(
            parse_context(&Bytes::from_static(b"{\"context\":[1]}")),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn workflow_crud_round_trip() {
        let state = state().await;

        let (status, body) = send(&state, json_request("POST", "/api/workflows", notify_workflow("manual"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["enabled"], json!(true));
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/workflows/{}", id);

        let (status, body) = send(&state, json_request("PUT", &uri, json!({ "enabled": false }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["enabled"], json!(false));
        assert_eq!(body["data"]["name"], json!("Announce"));

        let (_, body) = send(&state, empty_request("GET", "/api/workflows")).await;
        assert_eq!(body["count"], json!(1));

        let (status, _) = send(&state, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&state, empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_kind"], json!("workflow_not_found"));
    }

    #[tokio::test]
    async fn invalid_workflow_is_bad_request() {
        let state = state().await;
        let (status, body) = send(&state, json_request("POST", "/api/workflows", json!({ "name": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_kind"], json!("validation_error"));
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let state = state().await;
        let (status, body) = send(
            &state,
            json_request("POST", "/api/workflows", json!({ "name": "n", "trigger_type": "manual", "enabled": "yes" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_kind"], json!("validation_error"));

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/workflows/trigger/manual")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn unreadable_stored_workflow_is_a_server_error() {
        let pool = crate::database::connect_in_memory().await.unwrap();
        let state = AppState::new(pool.clone(), &crate::config::Config::default());
        let (_, body) = send(&state, json_request("POST", "/api/workflows", notify_workflow("manual"))).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        sqlx::query("UPDATE workflows SET trigger_config = '{bad' WHERE id = ?")
            .bind(&id)
            .execute(&pool)
            .await
            .unwrap();

        let (status, body) = send(&state, empty_request("GET", "/api/workflows")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error_kind"], json!("corrupt_record"));
    }

    #[tokio::test]
    async fn execute_reports_outcome_or_not_found() {
        let state = state().await;
        let (_, body) = send(&state, json_request("POST", "/api/workflows", notify_workflow("manual"))).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &state,
            json_request("POST", &format!("/api/workflows/{}/execute", id), json!({ "context": { "who": "ops" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["result"]["message"], json!("Hello ops"));

        let (status, _) = send(&state, empty_request("POST", "/api/workflows/missing/execute")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn execute_disabled_workflow_reports_disabled() {
        let state = state().await;
        let mut workflow = notify_workflow("manual");
        workflow["enabled"] = json!(false);
        let (_, body) = send(&state, json_request("POST", "/api/workflows", workflow)).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&state, empty_request("POST", &format!("/api/workflows/{}/execute", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Workflow is disabled"));
    }

    #[tokio::test]
    async fn trigger_by_type_counts_results() {
        let state = state().await;
        send(&state, json_request("POST", "/api/workflows", notify_workflow("deploy"))).await;
        send(&state, json_request("POST", "/api/workflows", notify_workflow("deploy"))).await;
        send(&state, json_request("POST", "/api/workflows", notify_workflow("other"))).await;

        let (status, body) = send(
            &state,
            json_request("POST", "/api/workflows/trigger/deploy", json!({ "context": { "who": "team" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["triggered"], json!(2));
        assert_eq!(body["results"][1]["result"]["message"], json!("Hello team"));

        let (_, body) = send(&state, empty_request("POST", "/api/workflows/trigger/nothing")).await;
        assert_eq!(body["triggered"], json!(0));
        assert_eq!(body["results"], json!([]));
    }
}
