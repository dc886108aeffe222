/// Task management layer
///
/// Task records, their validation rules and the `TaskStore` capability the
/// workflow engine mutates tasks through.

// Task record types, enums and validation
pub mod types;

// TaskStore trait and the SQLite implementation with audit logging
pub mod store;

pub use store::{SqliteTaskStore, TaskStore};
pub use types::{NewTask, Task, TaskFilter, TaskPriority, TaskStats, TaskStatus, TaskUpdate};
