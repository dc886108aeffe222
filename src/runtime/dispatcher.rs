/// Action dispatch
///
/// Performs exactly one side effect per action: a task store mutation or a
/// notification record. Templates in the action config are interpolated
/// against the event context first.

use crate::error::{Error, Result};
use crate::notification::{Notification, NotificationSink};
use crate::runtime::action::{
    Action, AssignTaskConfig, CreateTaskConfig, SendNotificationConfig, UpdateTaskConfig,
};
use crate::runtime::interpolate::{interpolate, interpolate_opt};
use crate::task::{NewTask, Task, TaskStore, TaskUpdate};
use crate::workflow::EventContext;
use serde::Serialize;
use std::sync::Arc;

/// Result payload of a dispatched action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    Task(Task),
    Notification(Notification),
}

/// Executes actions against injected task and notification collaborators
#[derive(Clone)]
pub struct ActionDispatcher {
    tasks: Arc<dyn TaskStore>,
    notifications: Arc<dyn NotificationSink>,
}

impl ActionDispatcher {
    pub fn new(tasks: Arc<dyn TaskStore>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self { tasks, notifications }
    }

    pub async fn dispatch(&self, action: &Action, context: &EventContext) -> Result<ActionOutput> {
        tracing::debug!("⚙️ Dispatching {} action", action.action_type());

        let result = match action {
            Action::CreateTask(config) => self.create_task(config, context).await,
            Action::UpdateTask(config) => self.update_task(config, context).await,
            Action::AssignTask(config) => self.assign_task(config, context).await,
            Action::SendNotification(config) => self.send_notification(config, context).await,
        };

        // Domain errors pass through; collaborator breakage becomes an execution failure
        result.map_err(|e| {
            if e.is_infrastructure() {
                Error::Execution(format!("{} action failed: {}", action.action_type(), e))
            } else {
                e
            }
        })
    }

    async fn create_task(&self, config: &CreateTaskConfig, context: &EventContext) -> Result<ActionOutput> {
        let new_task = NewTask {
            title: interpolate(&config.title, context),
            description: interpolate_opt(config.description.as_deref(), context),
            status: Some(config.status.unwrap_or_default()),
            priority: Some(config.priority.unwrap_or_default()),
            assigned_to: interpolate_opt(config.assigned_to.as_deref(), context),
            due_date: None,
            tags: config.tags.clone(),
        };

        let task = self.tasks.create(new_task).await?;
        Ok(ActionOutput::Task(task))
    }

    async fn update_task(&self, config: &UpdateTaskConfig, context: &EventContext) -> Result<ActionOutput> {
        let task_id = interpolate(&config.task_id, context);

        let update = TaskUpdate {
            status: config.status,
            priority: config.priority,
            assigned_to: config
                .assigned_to
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(|a| Some(interpolate(a, context))),
            ..TaskUpdate::default()
        };

        let task = self.tasks.update(&task_id, update).await?;
        Ok(ActionOutput::Task(task))
    }

    async fn assign_task(&self, config: &AssignTaskConfig, context: &EventContext) -> Result<ActionOutput> {
        let task_id = interpolate(&config.task_id, context);
        let assignee = interpolate(&config.assignee, context);

        let task = self.tasks.update(&task_id, TaskUpdate::assign(assignee)).await?;
        Ok(ActionOutput::Task(task))
    }

    async fn send_notification(
        &self,
        config: &SendNotificationConfig,
        context: &EventContext,
    ) -> Result<ActionOutput> {
        let message = interpolate(&config.message, context);
        let task_id = config.task_id.clone().filter(|id| !id.is_empty());

        let notification = self.notifications.record(task_id, message).await?;
        Ok(ActionOutput::Notification(notification))
    }
}
