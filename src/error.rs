/// Error taxonomy shared by the stores, the workflow engine and the HTTP layer
///
/// Every fallible library operation returns `crate::error::Result`. The HTTP
/// layer maps each variant to a status code through `Error::kind`.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed task or workflow fields (client-correctable)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced task id does not exist
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Referenced workflow id does not exist
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Workflow carries an action_type outside the supported set
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    /// Trigger condition uses an operator the evaluator does not know
    #[error("Unknown trigger operator: {0}")]
    UnknownTriggerOperator(String),

    /// Any other action failure
    #[error("Execution failed: {0}")]
    Execution(String),

    /// A persisted row could not be decoded back into its record type
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::TaskNotFound(_) => "task_not_found",
            Error::WorkflowNotFound(_) => "workflow_not_found",
            Error::UnknownActionType(_) => "unknown_action_type",
            Error::UnknownTriggerOperator(_) => "unknown_trigger_operator",
            Error::Execution(_) => "execution_error",
            Error::CorruptRecord(_) => "corrupt_record",
            Error::Database(_) => "database_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the error refers to a missing task or workflow
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TaskNotFound(_) | Error::WorkflowNotFound(_))
    }

    /// Whether the caller can fix the error by changing its input
    ///
    /// Request bodies that fail to parse surface as `Validation`, so
    /// `Serialization` only covers server-side encoding and stays a server error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::UnknownActionType(_) | Error::UnknownTriggerOperator(_)
        )
    }

    /// Whether the error comes from storage rather than from the request or workflow
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Serialization(_) | Error::CorruptRecord(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
