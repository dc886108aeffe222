/// Workflow actions as a closed set of variants
///
/// The stored action_type string is resolved to an `ActionType`, then the
/// action_config object is narrowed into the config struct for that variant.
/// Unknown tags fail with `UnknownActionType`; missing or mistyped keys fail
/// with `Validation` before any side effect happens.

use crate::error::{Error, Result};
use crate::task::{TaskPriority, TaskStatus};
use crate::workflow::ConfigMap;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateTask,
    UpdateTask,
    AssignTask,
    SendNotification,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateTask => "create_task",
            ActionType::UpdateTask => "update_task",
            ActionType::AssignTask => "assign_task",
            ActionType::SendNotification => "send_notification",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create_task" => Ok(ActionType::CreateTask),
            "update_task" => Ok(ActionType::UpdateTask),
            "assign_task" => Ok(ActionType::AssignTask),
            "send_notification" => Ok(ActionType::SendNotification),
            other => Err(Error::UnknownActionType(other.to_string())),
        }
    }
}

/// create_task: title/description/assigned_to are templates
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateTaskConfig {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// update_task: task_id and assigned_to are templates
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateTaskConfig {
    pub task_id: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// assign_task: task_id and assignee are templates
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssignTaskConfig {
    pub task_id: String,
    pub assignee: String,
}

/// send_notification: message is a template
///
/// task_id is recorded verbatim, without interpolation, unlike every other
/// task reference in action configs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendNotificationConfig {
    pub message: String,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// A fully validated workflow action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateTask(CreateTaskConfig),
    UpdateTask(UpdateTaskConfig),
    AssignTask(AssignTaskConfig),
    SendNotification(SendNotificationConfig),
}

impl Action {
    /// Resolve a stored action_type tag and narrow its config
    pub fn from_config(action_type: &str, config: &ConfigMap) -> Result<Self> {
        let kind: ActionType = action_type.parse()?;

        Ok(match kind {
            ActionType::CreateTask => Action::CreateTask(narrow(kind, config)?),
            ActionType::UpdateTask => Action::UpdateTask(narrow(kind, config)?),
            ActionType::AssignTask => Action::AssignTask(narrow(kind, config)?),
            ActionType::SendNotification => Action::SendNotification(narrow(kind, config)?),
        })
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Action::CreateTask(_) => ActionType::CreateTask,
            Action::UpdateTask(_) => ActionType::UpdateTask,
            Action::AssignTask(_) => ActionType::AssignTask,
            Action::SendNotification(_) => ActionType::SendNotification,
        }
    }
}

/// An empty string or null leaves the field unset
fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn narrow<T: DeserializeOwned>(kind: ActionType, config: &ConfigMap) -> Result<T> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| Error::Validation(format!("Invalid action_config for {}: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> ConfigMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn resolves_known_tags() {
        let action = Action::from_config(
            "assign_task",
            &config(json!({ "task_id": "{{task_id}}", "assignee": "lead" })),
        )
        .unwrap();

        assert_eq!(action.action_type(), ActionType::AssignTask);
        assert_eq!(
            action,
            Action::AssignTask(AssignTaskConfig {
                task_id: "{{task_id}}".into(),
                assignee: "lead".into(),
            })
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = Action::from_config("delete_task", &ConfigMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownActionType(tag) if tag == "delete_task"));
    }

    #[test]
    fn missing_required_keys_are_validation_errors() {
        let err = Action::from_config("assign_task", &config(json!({ "task_id": "T1" }))).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("assignee")));

        let err = Action::from_config("create_task", &ConfigMap::new()).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("title")));

        let err = Action::from_config("send_notification", &ConfigMap::new()).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("message")));
    }

    #[test]
    fn invalid_status_in_config_is_rejected() {
        let err = Action::from_config(
            "update_task",
            &config(json!({ "task_id": "T1", "status": "archived" })),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_status_and_priority_are_unset() {
        let action = Action::from_config(
            "update_task",
            &config(json!({ "task_id": "T1", "status": "", "priority": null, "assigned_to": "bob" })),
        )
        .unwrap();
        assert_eq!(
            action,
            Action::UpdateTask(UpdateTaskConfig {
                task_id: "T1".into(),
                status: None,
                priority: None,
                assigned_to: Some("bob".into()),
            })
        );

        let action = Action::from_config(
            "create_task",
            &config(json!({ "title": "t", "status": "in_progress", "priority": "", "tags": null })),
        )
        .unwrap();
        let Action::CreateTask(cfg) = action else {
            panic!("expected create_task");
        };
        assert_eq!(cfg.status, Some(TaskStatus::InProgress));
        assert_eq!(cfg.priority, None);
        assert!(cfg.tags.is_empty());
    }

    #[test]
    fn create_task_optionals_default() {
        let action = Action::from_config("create_task", &config(json!({ "title": "Fix {{issue_title}}" }))).unwrap();
        let Action::CreateTask(cfg) = action else {
            panic!("expected create_task");
        };
        assert_eq!(cfg.status, None);
        assert_eq!(cfg.priority, None);
        assert!(cfg.tags.is_empty());
    }
}
