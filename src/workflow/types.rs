/// Core workflow type definitions
///
/// A workflow pairs a trigger (type tag plus optional condition) with a single
/// action. Trigger and action configs are opaque JSON objects at rest; the
/// runtime narrows them into typed shapes when a workflow executes.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded form of a stored trigger_config / action_config column
pub type ConfigMap = Map<String, Value>;

/// A persisted workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// UUID v4 identifier assigned by storage
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    pub description: String,
    /// Event kind that activates this workflow (e.g., "task_created", "github_issue")
    pub trigger_type: String,
    /// Optional `condition: { field, operator, value }` block
    pub trigger_config: ConfigMap,
    /// Action tag (create_task, update_task, assign_task, send_notification).
    /// Kept as the stored string; unknown tags are rejected at execution time.
    pub action_type: String,
    /// Action parameters, shape depends on action_type
    pub action_config: ConfigMap,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger_type: String,
    #[serde(default)]
    pub trigger_config: ConfigMap,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub action_config: ConfigMap,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for NewWorkflow {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            trigger_type: String::new(),
            trigger_config: ConfigMap::new(),
            action_type: String::new(),
            action_config: ConfigMap::new(),
            enabled: enabled_by_default(),
        }
    }
}

impl NewWorkflow {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Name is required");
        }
        if self.trigger_type.trim().is_empty() {
            errors.push("Trigger type is required");
        }
        if self.action_type.trim().is_empty() {
            errors.push("Action type is required");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join(", ")))
        }
    }
}

/// Partial update of a workflow; only supplied fields change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub trigger_type: Option<String>,
    pub trigger_config: Option<ConfigMap>,
    pub action_type: Option<String>,
    pub action_config: Option<ConfigMap>,
    pub enabled: Option<bool>,
}

impl WorkflowUpdate {
    pub fn validate(&self) -> Result<()> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());

        let mut errors = Vec::new();
        if blank(&self.name) {
            errors.push("Name cannot be empty");
        }
        if blank(&self.trigger_type) {
            errors.push("Trigger type cannot be empty");
        }
        if blank(&self.action_type) {
            errors.push("Action type cannot be empty");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join(", ")))
        }
    }
}

/// Ephemeral key-value data describing a triggering event
///
/// Supplied by the caller for manual execution or synthesized from an external
/// payload (e.g., a GitHub webhook). Used for condition evaluation and
/// template interpolation, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventContext(Map<String, Value>);

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only when a value is present; absent payload fields stay absent
    pub fn insert_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for EventContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EventContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
