/// Taskflow: task tracking with rule-based workflow automation
///
/// Main entry point for the Taskflow server. Loads `.env`, reads configuration
/// from the environment and starts the HTTP server.

use taskflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Task management API at /api/tasks/*
/// - Workflow management and execution at /api/workflows/*
/// - GitHub webhook receiver at /api/github/webhook
/// - Health check at /health
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine, the environment may already be set
    dotenvy::dotenv().ok();

    // Load configuration (defaults to 0.0.0.0:3000 and data/taskflow.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
