/// Server setup and initialization
///
/// Wires together all components: database, stores, workflow engine and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_api_routes, AppState},
    config::Config,
    database,
};
use anyhow::Result;
use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes and middleware
///
/// Opens the database (creating the schema when needed), builds the task and
/// notification stores and the workflow engine, and mounts every route.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📁 Opening database: {}", config.database.path);
    let pool = database::connect(&config.database.path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", config.database.path, e))?;

    if config.github.webhook_secret.is_none() {
        tracing::warn!("⚠️ GITHUB_WEBHOOK_SECRET is not set, webhook signatures will not be verified");
    }
    if config.engine.permissive_operators {
        tracing::warn!("⚠️ Permissive operators enabled, unknown condition operators always match");
    }

    tracing::info!("⚙️ Initializing stores and workflow engine");
    let app_state = AppState::new(pool, &config);

    Ok(create_router(app_state))
}

/// Build the router over an already wired application state
pub fn create_router(app_state: AppState) -> Router {
    tracing::info!("📡 Creating HTTP router with all endpoints");
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(create_api_routes())
        .fallback(not_found)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting taskflow server...");

    let app = create_app(config.clone()).await?;

    // Bind to the configured address
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Service banner with the endpoint map
async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Task Workflow Automation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "tasks": "/api/tasks",
            "workflows": "/api/workflows",
            "github_webhook": "/api/github/webhook",
            "health": "/health"
        }
    }))
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Endpoint not found" })),
    )
}
