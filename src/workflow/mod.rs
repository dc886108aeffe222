/// Workflow Management Layer
///
/// This module handles workflow definitions and their persistence:
/// - Type definitions (Workflow, NewWorkflow, WorkflowUpdate, EventContext)
/// - SQLite persistence with sqlx, JSON configs decoded at the boundary

// Core workflow type definitions
pub mod types;

// SQLite persistence layer for workflow storage
pub mod storage;

// Re-export commonly used types
pub use storage::{StoredWorkflow, WorkflowStorage};
pub use types::{ConfigMap, EventContext, NewWorkflow, Workflow, WorkflowUpdate};
