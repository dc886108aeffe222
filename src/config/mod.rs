/// Configuration management for the taskflow server
///
/// Handles server binding, database location, webhook secrets and engine behaviour.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// GitHub webhook configuration
    pub github: GithubConfig,
    /// Workflow engine configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (default: "data/taskflow.db")
    /// The parent directory is created on startup.
    pub path: String,
}

/// GitHub webhook configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Shared secret for X-Hub-Signature-256 verification.
    /// When unset, signature verification is skipped (development mode).
    pub webhook_secret: Option<String>,
}

/// Workflow engine behaviour switches
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Treat unrecognized condition operators as a match instead of an error
    pub permissive_operators: bool,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("TASKFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("TASKFLOW_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                path: std::env::var("TASKFLOW_DB_PATH")
                    .unwrap_or_else(|_| "data/taskflow.db".to_string()),
            },
            github: GithubConfig {
                webhook_secret: std::env::var("GITHUB_WEBHOOK_SECRET")
                    .ok()
                    .filter(|secret| !secret.is_empty()),
            },
            engine: EngineConfig {
                permissive_operators: std::env::var("TASKFLOW_PERMISSIVE_OPERATORS")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
        }
    }
}

/// Interpret common truthy spellings of a boolean environment flag
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flag_parsing_accepts_truthy_spellings() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }
}
