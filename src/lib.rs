/// Taskflow: task tracking with rule-based workflow automation
///
/// This library provides task management, workflow definitions and the engine
/// that reacts to events (task creation, GitHub webhooks, manual triggers) by
/// running the matching workflows' actions.

// Core configuration and setup
pub mod config;

// Shared error taxonomy
pub mod error;

// SQLite connection and schema management
pub mod database;

// Task records and the TaskStore capability
pub mod task;

// Notification records and the NotificationSink capability
pub mod notification;

// Workflow management layer - definitions, storage and event contexts
pub mod workflow;

// Runtime execution engine - conditions, interpolation and action dispatch
pub mod runtime;

// HTTP API layer - REST endpoints for tasks, workflows and webhooks
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{Error, Result};
pub use runtime::{ExecutionOutcome, WorkflowEngine};
pub use server::start_server;
pub use task::{Task, TaskStore};
pub use workflow::{EventContext, Workflow};
