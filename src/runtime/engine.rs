/// Workflow execution engine
///
/// Orchestrates trigger matching and action execution. Given an event
/// (trigger type + context) it loads enabled workflows listening on that
/// type, evaluates their conditions and executes each match. Execution
/// failures are captured per workflow and never abort sibling workflows.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::notification::NotificationSink;
use crate::runtime::action::Action;
use crate::runtime::condition::{should_trigger, OperatorPolicy};
use crate::runtime::dispatcher::{ActionDispatcher, ActionOutput};
use crate::task::TaskStore;
use crate::workflow::{EventContext, Workflow, WorkflowStorage};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// Outcome of executing one workflow
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The action ran and produced `result`
    Succeeded {
        workflow_id: String,
        workflow_name: String,
        result: ActionOutput,
    },
    /// The workflow is disabled; nothing ran
    Disabled { workflow_id: String },
    /// Loading, matching or executing the workflow failed
    Failed { workflow_id: String, error: Error },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded { .. })
    }

    pub fn workflow_id(&self) -> &str {
        match self {
            ExecutionOutcome::Succeeded { workflow_id, .. }
            | ExecutionOutcome::Disabled { workflow_id }
            | ExecutionOutcome::Failed { workflow_id, .. } => workflow_id,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            ExecutionOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Serialize for ExecutionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ExecutionOutcome::Succeeded {
                workflow_id,
                workflow_name,
                result,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("workflow_id", workflow_id)?;
                map.serialize_entry("workflow_name", workflow_name)?;
                map.serialize_entry("result", result)?;
                map.end()
            }
            ExecutionOutcome::Disabled { workflow_id } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("workflow_id", workflow_id)?;
                map.serialize_entry("message", "Workflow is disabled")?;
                map.end()
            }
            ExecutionOutcome::Failed { workflow_id, error } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("workflow_id", workflow_id)?;
                map.serialize_entry("error", &error.to_string())?;
                map.serialize_entry("error_kind", error.kind())?;
                map.end()
            }
        }
    }
}

/// Trigger-match-execute pipeline over injected collaborators
#[derive(Clone)]
pub struct WorkflowEngine {
    storage: WorkflowStorage,
    dispatcher: ActionDispatcher,
    operator_policy: OperatorPolicy,
}

impl WorkflowEngine {
    pub fn new(
        storage: WorkflowStorage,
        tasks: Arc<dyn TaskStore>,
        notifications: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            dispatcher: ActionDispatcher::new(tasks, notifications),
            operator_policy: OperatorPolicy::from_permissive_flag(config.permissive_operators),
        }
    }

    /// Execute a single workflow by id
    ///
    /// Fails only with `WorkflowNotFound` (or a storage error while loading).
    /// Disabled workflows produce `Disabled` without side effects, even when
    /// their configs are unreadable; every other failure is reported as `Failed`.
    pub async fn execute_workflow(&self, workflow_id: &str, context: &EventContext) -> Result<ExecutionOutcome> {
        let stored = self
            .storage
            .get_stored_workflow(workflow_id)
            .await?
            .ok_or_else(|| Error::WorkflowNotFound(workflow_id.to_string()))?;

        if !stored.enabled() {
            tracing::info!("⏸️ Skipping disabled workflow: {} ({})", stored.id, stored.name());
            return Ok(ExecutionOutcome::Disabled { workflow_id: stored.id });
        }

        let workflow = match stored.decode() {
            Ok(workflow) => workflow,
            Err(error) => {
                tracing::error!("❌ Workflow {} has an unreadable configuration: {}", workflow_id, error);
                return Ok(ExecutionOutcome::Failed {
                    workflow_id: workflow_id.to_string(),
                    error,
                });
            }
        };

        tracing::info!("🚀 Executing workflow: {} ({}) action: {}", workflow.id, workflow.name, workflow.action_type);
        let start_time = std::time::Instant::now();

        let outcome = match self.run_action(&workflow, context).await {
            Ok(result) => {
                tracing::info!("✅ Workflow {} completed in {:?}", workflow.id, start_time.elapsed());
                ExecutionOutcome::Succeeded {
                    workflow_id: workflow.id,
                    workflow_name: workflow.name,
                    result,
                }
            }
            Err(error) => {
                tracing::error!(
                    "❌ Workflow {} failed after {:?} - Error: {}",
                    workflow.id,
                    start_time.elapsed(),
                    error
                );
                ExecutionOutcome::Failed {
                    workflow_id: workflow.id,
                    error,
                }
            }
        };

        Ok(outcome)
    }

    /// Fire every enabled workflow whose trigger type and condition match
    ///
    /// Outcomes follow storage order. Non-matching workflows are skipped
    /// silently; a workflow whose config or condition is invalid yields a
    /// `Failed` outcome without affecting the others.
    pub async fn trigger_workflows(&self, trigger_type: &str, context: &EventContext) -> Result<Vec<ExecutionOutcome>> {
        let candidates = self.storage.load_enabled_for_trigger(trigger_type).await?;

        tracing::info!(
            "📥 Trigger '{}' with {} context fields: {} candidate workflows",
            trigger_type,
            context.len(),
            candidates.len()
        );

        let mut outcomes = Vec::new();

        for stored in candidates {
            let workflow_id = stored.id.clone();

            let matched = stored
                .decode()
                .and_then(|workflow| should_trigger(&workflow.trigger_config, context, self.operator_policy));

            match matched {
                Ok(true) => {
                    let outcome = match self.execute_workflow(&workflow_id, context).await {
                        Ok(outcome) => outcome,
                        // Removed or unreadable between lookup and execution
                        Err(error) => ExecutionOutcome::Failed {
                            workflow_id: workflow_id.clone(),
                            error,
                        },
                    };
                    outcomes.push(outcome);
                }
                Ok(false) => {
                    tracing::debug!("⏭️ Condition not met for workflow {}", workflow_id);
                }
                Err(error) => {
                    tracing::warn!("⚠️ Could not evaluate trigger for workflow {}: {}", workflow_id, error);
                    outcomes.push(ExecutionOutcome::Failed { workflow_id, error });
                }
            }
        }

        tracing::info!("🎉 Trigger '{}' executed {} workflows", trigger_type, outcomes.len());

        Ok(outcomes)
    }

    async fn run_action(&self, workflow: &Workflow, context: &EventContext) -> Result<ActionOutput> {
        let action = Action::from_config(&workflow.action_type, &workflow.action_config)?;
        self.dispatcher.dispatch(&action, context).await
    }
}
