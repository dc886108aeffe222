/// SQLite persistence layer for workflow storage
///
/// Handles workflow CRUD operations and the trigger lookup the engine runs for
/// every event. Trigger and action configs are stored as JSON text and decoded
/// at this boundary.

use crate::error::{Error, Result};
use crate::workflow::types::{ConfigMap, NewWorkflow, Workflow, WorkflowUpdate};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    QueryBuilder, Row, Sqlite,
};

/// SQLite-based workflow storage manager
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    /// SQLite connection pool for the application database
    pool: SqlitePool,
}

/// A workflow row whose JSON config columns have not been decoded yet
///
/// Trigger lookups hand these to the engine so that one workflow with a
/// corrupt config only fails its own evaluation.
#[derive(Debug, Clone)]
pub struct StoredWorkflow {
    pub id: String,
    name: String,
    description: String,
    trigger_type: String,
    trigger_config: String,
    action_type: String,
    action_config: String,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl StoredWorkflow {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            trigger_type: row.try_get("trigger_type")?,
            trigger_config: row.try_get("trigger_config")?,
            action_type: row.try_get("action_type")?,
            action_config: row.try_get("action_config")?,
            enabled: row.try_get("enabled")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enabled flag, readable without decoding the configs
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Decode the JSON config columns into a full workflow
    pub fn decode(self) -> Result<Workflow> {
        let trigger_config = decode_config(&self.id, "trigger_config", &self.trigger_config)?;
        let action_config = decode_config(&self.id, "action_config", &self.action_config)?;

        Ok(Workflow {
            id: self.id,
            name: self.name,
            description: self.description,
            trigger_type: self.trigger_type,
            trigger_config,
            action_type: self.action_type,
            action_config,
            enabled: self.enabled,
            created_at: self.created_at,
        })
    }
}

/// Parse a stored config column, which must hold a JSON object
fn decode_config(workflow_id: &str, column: &str, raw: &str) -> Result<ConfigMap> {
    if raw.trim().is_empty() {
        return Ok(ConfigMap::new());
    }
    serde_json::from_str(raw).map_err(|e| {
        Error::CorruptRecord(format!(
            "Workflow '{}' has an unreadable {}: {}",
            workflow_id, column, e
        ))
    })
}

impl WorkflowStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate and persist a new workflow
    pub async fn create_workflow(&self, new_workflow: NewWorkflow) -> Result<Workflow> {
        new_workflow.validate()?;

        let workflow = Workflow {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_workflow.name,
            description: new_workflow.description.unwrap_or_default(),
            trigger_type: new_workflow.trigger_type,
            trigger_config: new_workflow.trigger_config,
            action_type: new_workflow.action_type,
            action_config: new_workflow.action_config,
            enabled: new_workflow.enabled,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, description, trigger_type, trigger_config, action_type, action_config, enabled, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&workflow.trigger_type)
        .bind(serde_json::to_string(&workflow.trigger_config)?)
        .bind(&workflow.action_type)
        .bind(serde_json::to_string(&workflow.action_config)?)
        .bind(workflow.enabled)
        .bind(workflow.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!("🔥 Created workflow: {} ({}) on trigger '{}'", workflow.id, workflow.name, workflow.trigger_type);

        Ok(workflow)
    }

    /// Retrieve a workflow by ID
    pub async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>> {
        self.get_stored_workflow(id)
            .await?
            .map(StoredWorkflow::decode)
            .transpose()
    }

    /// Retrieve a workflow row by ID without decoding its configs
    pub async fn get_stored_workflow(&self, id: &str) -> Result<Option<StoredWorkflow>> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(StoredWorkflow::from_row).transpose()
    }

    /// List all workflows, newest first
    pub async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let rows = sqlx::query("SELECT * FROM workflows ORDER BY created_at DESC, rowid DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| StoredWorkflow::from_row(row)?.decode())
            .collect()
    }

    /// Load enabled workflows listening on `trigger_type`, in storage order
    ///
    /// The match on trigger_type is exact and case-sensitive. Configs are left
    /// undecoded so the caller can isolate per-workflow decode failures.
    pub async fn load_enabled_for_trigger(&self, trigger_type: &str) -> Result<Vec<StoredWorkflow>> {
        let rows = sqlx::query(
            "SELECT * FROM workflows WHERE trigger_type = ? AND enabled = 1 ORDER BY rowid",
        )
        .bind(trigger_type)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(StoredWorkflow::from_row).collect()
    }

    /// Apply a partial update; fails with `WorkflowNotFound` for unknown ids
    pub async fn update_workflow(&self, id: &str, update: WorkflowUpdate) -> Result<Workflow> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::WorkflowNotFound(id.to_string()));
        }

        update.validate()?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE workflows SET ");
        let mut fields = builder.separated(", ");
        let mut changed = false;

        if let Some(name) = update.name {
            fields.push("name = ").push_bind_unseparated(name);
            changed = true;
        }
        if let Some(description) = update.description {
            fields.push("description = ").push_bind_unseparated(description);
            changed = true;
        }
        if let Some(trigger_type) = update.trigger_type {
            fields.push("trigger_type = ").push_bind_unseparated(trigger_type);
            changed = true;
        }
        if let Some(trigger_config) = update.trigger_config {
            fields.push("trigger_config = ").push_bind_unseparated(serde_json::to_string(&trigger_config)?);
            changed = true;
        }
        if let Some(action_type) = update.action_type {
            fields.push("action_type = ").push_bind_unseparated(action_type);
            changed = true;
        }
        if let Some(action_config) = update.action_config {
            fields.push("action_config = ").push_bind_unseparated(serde_json::to_string(&action_config)?);
            changed = true;
        }
        if let Some(enabled) = update.enabled {
            fields.push("enabled = ").push_bind_unseparated(enabled);
            changed = true;
        }

        if changed {
            builder.push(" WHERE id = ").push_bind(id.to_string());
            builder.build().execute(&self.pool).await?;
            tracing::info!("🔥 Updated workflow: {}", id);
        }

        self.get_workflow(id)
            .await?
            .ok_or_else(|| Error::WorkflowNotFound(id.to_string()))
    }

    /// Delete a workflow by ID; fails with `WorkflowNotFound` for unknown ids
    pub async fn delete_workflow(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkflowNotFound(id.to_string()));
        }

        tracing::info!("Deleted workflow: {}", id);

        Ok(())
    }
}
