/// GitHub webhook receiver
///
/// Verifies the `X-Hub-Signature-256` header against the raw request body when
/// a secret is configured, maps the `X-GitHub-Event` payload to an event
/// context and fires the matching trigger type. Unmapped events are
/// acknowledged and ignored.

use crate::{
    api::{parse_body, AppState},
    error::Result,
    workflow::EventContext,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

/// Create GitHub webhook routes
pub fn create_github_routes() -> Router<AppState> {
    Router::new().route("/api/github/webhook", post(github_webhook))
}

/// Why a webhook signature was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    Missing,
    Invalid,
}

impl SignatureError {
    fn message(self) -> &'static str {
        match self {
            SignatureError::Missing => "Missing signature",
            SignatureError::Invalid => "Invalid signature",
        }
    }
}

/// Check a `sha256=<hex>` signature over `body`
///
/// Without a configured secret every request passes (development mode).
/// The comparison runs in constant time.
pub fn verify_signature(
    secret: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> std::result::Result<(), SignatureError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let signature = signature.ok_or(SignatureError::Missing)?;

    let expected = signature
        .strip_prefix("sha256=")
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or(SignatureError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Invalid)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Invalid)
}

/// Map a GitHub event and its payload to a trigger type and event context
///
/// Returns `None` for events no workflow trigger type corresponds to.
/// Payload fields that are absent are left out of the context.
pub fn event_context(event: &str, payload: &Value) -> Option<(&'static str, EventContext)> {
    let field = |pointer: &str| payload.pointer(pointer).cloned();

    let mut context = EventContext::new().with("event", event);
    context.insert_opt("repository", field("/repository/full_name"));
    context.insert_opt("sender", field("/sender/login"));

    let trigger_type = match event {
        "issues" => {
            context.insert_opt("action", field("/action"));
            context.insert_opt("issue_number", field("/issue/number"));
            context.insert_opt("issue_title", field("/issue/title"));
            context.insert_opt("issue_state", field("/issue/state"));
            context.insert_opt("assignee", field("/issue/assignee/login"));
            "github_issue"
        }
        "pull_request" => {
            context.insert_opt("action", field("/action"));
            context.insert_opt("pr_number", field("/pull_request/number"));
            context.insert_opt("pr_title", field("/pull_request/title"));
            context.insert_opt("pr_state", field("/pull_request/state"));
            context.insert_opt("author", field("/pull_request/user/login"));
            "github_pr"
        }
        "push" => {
            let git_ref = payload.get("ref").and_then(Value::as_str);
            context.insert_opt("ref", git_ref);
            context.insert_opt("branch", git_ref.map(|r| r.replacen("refs/heads/", "", 1)));
            context.insert_opt(
                "commits_count",
                payload.get("commits").and_then(Value::as_array).map(Vec::len),
            );
            context.insert_opt("pusher", field("/pusher/name"));
            "github_push"
        }
        "release" => {
            context.insert_opt("action", field("/action"));
            context.insert_opt("release_name", field("/release/name"));
            context.insert_opt("release_tag", field("/release/tag_name"));
            "github_release"
        }
        _ => return None,
    };

    Some((trigger_type, context))
}

/// Receive a GitHub webhook delivery
///
/// POST /api/github/webhook
async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Err(rejection) = verify_signature(state.github.webhook_secret.as_deref(), header(SIGNATURE_HEADER), &body) {
        tracing::warn!("⚠️ Rejected GitHub webhook: {}", rejection.message());
        let body = Json(json!({ "success": false, "error": rejection.message() }));
        return Ok((StatusCode::UNAUTHORIZED, body).into_response());
    }

    let event = header(EVENT_HEADER).unwrap_or_default().to_string();
    let payload: Value = parse_body(&body)?;

    tracing::info!("📨 Received GitHub webhook: {}", event);

    let results = match event_context(&event, &payload) {
        Some((trigger_type, context)) => state.engine.trigger_workflows(trigger_type, &context).await?,
        None => {
            tracing::info!("Unhandled GitHub event: {}", event);
            Vec::new()
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "Webhook received",
        "event": event,
        "triggered": results.len(),
        "results": results,
    }))
    .into_response())
}
