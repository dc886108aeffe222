/// Runtime Execution Engine
///
/// This module turns events into workflow side effects. It handles:
/// - Trigger condition evaluation against an event context
/// - `{{key}}` template interpolation
/// - Narrowing stored action configs into typed actions
/// - Dispatching actions to the task store and notification sink

// Typed action variants and config narrowing
pub mod action;

// Flat field/operator/value trigger conditions
pub mod condition;

// Side-effecting action handlers
pub mod dispatcher;

// Trigger matching and per-workflow execution
pub mod engine;

// Template substitution
pub mod interpolate;

// Re-export main types
pub use action::{Action, ActionType};
pub use condition::{should_trigger, OperatorPolicy, TriggerCondition};
pub use dispatcher::{ActionDispatcher, ActionOutput};
pub use engine::{ExecutionOutcome, WorkflowEngine};
pub use interpolate::interpolate;
