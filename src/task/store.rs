/// Task persistence behind the `TaskStore` capability
///
/// The workflow engine only sees the `TaskStore` trait (create, get, update,
/// delete). `SqliteTaskStore` implements it on top of sqlx and adds the
/// listing and statistics queries used by the HTTP layer. Every mutation
/// appends an audit entry inside the same transaction.

use crate::error::{Error, Result};
use crate::task::types::{NewTask, Task, TaskFilter, TaskStats, TaskUpdate};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    QueryBuilder, Row, Sqlite, SqliteConnection,
};

/// Task persistence capability consumed by the workflow engine
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Validate and persist a new task
    async fn create(&self, task: NewTask) -> Result<Task>;

    /// Fetch a task by id
    async fn get(&self, id: &str) -> Result<Option<Task>>;

    /// Apply a partial update; fails with `TaskNotFound` for unknown ids
    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task>;

    /// Delete a task; fails with `TaskNotFound` for unknown ids
    async fn delete(&self, id: &str) -> Result<()>;
}

/// SQLite-backed task store
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List tasks matching the filter, newest first
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM tasks WHERE 1=1");

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(assigned_to) = &filter.assigned_to {
            builder.push(" AND assigned_to = ").push_bind(assigned_to.clone());
        }

        builder.push(" ORDER BY created_at DESC, rowid DESC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(task_from_row).collect()
    }

    /// Count tasks overall and grouped by status and priority
    pub async fn stats(&self) -> Result<TaskStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let by_priority: Vec<(String, i64)> =
            sqlx::query_as("SELECT priority, COUNT(*) FROM tasks GROUP BY priority")
                .fetch_all(&self.pool)
                .await?;

        Ok(TaskStats {
            total,
            by_status: by_status.into_iter().collect(),
            by_priority: by_priority.into_iter().collect(),
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        new_task.validate()?;

        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: new_task.title,
            description: new_task.description.unwrap_or_default(),
            status: new_task.status.unwrap_or_default(),
            priority: new_task.priority.unwrap_or_default(),
            assigned_to: new_task.assigned_to.filter(|a| !a.is_empty()),
            due_date: new_task.due_date,
            tags: new_task.tags,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, assigned_to, due_date, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&task.assigned_to)
        .bind(task.due_date)
        .bind(serde_json::to_string(&task.tags)?)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await?;

        log_audit(&mut tx, &task.id, "create", serde_json::to_string(&task)?).await?;

        tx.commit().await?;

        tracing::info!("📝 Created task: {} ({})", task.id, task.title);

        Ok(task)
    }

    async fn get(&self, id: &str) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }

        update.validate()?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
        let mut fields = builder.separated(", ");

        if let Some(title) = &update.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(description) = &update.description {
            fields.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(status) = update.status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(priority) = update.priority {
            fields.push("priority = ").push_bind_unseparated(priority.as_str());
        }
        if let Some(assigned_to) = &update.assigned_to {
            fields.push("assigned_to = ").push_bind_unseparated(assigned_to.clone());
        }
        if let Some(due_date) = update.due_date {
            fields.push("due_date = ").push_bind_unseparated(due_date);
        }
        if let Some(tags) = &update.tags {
            fields.push("tags = ").push_bind_unseparated(serde_json::to_string(tags)?);
        }
        fields.push("updated_at = ").push_bind_unseparated(Utc::now());

        builder.push(" WHERE id = ").push_bind(id.to_string());
        builder.build().execute(&mut *tx).await?;

        log_audit(&mut tx, id, "update", serde_json::to_string(&update)?).await?;

        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let task = task_from_row(&row)?;

        tx.commit().await?;

        tracing::info!("✏️ Updated task: {}", id);

        Ok(task)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let task = match row {
            Some(row) => task_from_row(&row)?,
            None => return Err(Error::TaskNotFound(id.to_string())),
        };

        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        log_audit(&mut tx, id, "delete", serde_json::to_string(&task)?).await?;

        tx.commit().await?;

        tracing::info!("🗑️ Deleted task: {}", id);

        Ok(())
    }
}

/// Append an audit entry for a task mutation
async fn log_audit(
    conn: &mut SqliteConnection,
    entity_id: &str,
    action: &str,
    details: String,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, entity_type, entity_id, action, details, timestamp)
        VALUES (?, 'task', ?, ?, ?, ?)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(entity_id)
    .bind(action)
    .bind(details)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;
    let tags: String = row.try_get("tags")?;

    let corrupt = |column: &str, detail: String| {
        Error::CorruptRecord(format!("Task '{}' has an unreadable {}: {}", id, column, detail))
    };

    let status = status.parse().map_err(|e: Error| corrupt("status", e.to_string()))?;
    let priority = priority.parse().map_err(|e: Error| corrupt("priority", e.to_string()))?;
    let tags = serde_json::from_str(&tags).map_err(|e| corrupt("tags", e.to_string()))?;

    Ok(Task {
        id,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status,
        priority,
        assigned_to: row.try_get("assigned_to")?,
        due_date: row.try_get("due_date")?,
        tags,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::task::types::{TaskPriority, TaskStatus};

    async fn store() -> SqliteTaskStore {
        SqliteTaskStore::new(database::connect_in_memory().await.unwrap())
    }

    async fn audit_actions(store: &SqliteTaskStore, id: &str) -> Vec<String> {
        sqlx::query_scalar("SELECT action FROM audit_log WHERE entity_id = ? ORDER BY rowid")
            .bind(id)
            .fetch_all(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_applies_defaults_and_round_trips() {
        let store = store().await;
        let created = store
            .create(NewTask {
                title: "Write docs".into(),
                tags: vec!["docs".into(), "api".into()],
                ..NewTask::default()
            })
            .await
            .unwrap();

        assert_eq!(created.status, TaskStatus::Pending);
        assert_eq!(created.priority, TaskPriority::Medium);
        assert_eq!(created.description, "");
        assert_eq!(created.assigned_to, None);

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(audit_actions(&store, &created.id).await, vec!["create"]);
    }

    #[tokio::test]
    async fn create_rejects_invalid_title() {
        let store = store().await;
        let err = store.create(NewTask::titled("")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let store = store().await;
        let created = store
            .create(NewTask {
                title: "Triage".into(),
                assigned_to: Some("alice".into()),
                priority: Some(TaskPriority::Low),
                ..NewTask::default()
            })
            .await
            .unwrap();

        let updated = store
            .update(
                &created.id,
                TaskUpdate {
                    status: Some(TaskStatus::InProgress),
                    ..TaskUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.priority, TaskPriority::Low);
        assert_eq!(updated.assigned_to.as_deref(), Some("alice"));
        assert_eq!(updated.title, "Triage");
        assert!(updated.updated_at >= created.updated_at);

        let cleared = store
            .update(
                &created.id,
                TaskUpdate {
                    assigned_to: Some(None),
                    ..TaskUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.assigned_to, None);
        assert_eq!(audit_actions(&store, &created.id).await, vec!["create", "update", "update"]);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_tasks() {
        let store = store().await;

        let err = store.update("missing", TaskUpdate::assign("bob")).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(id) if id == "missing"));

        let err = store.delete("missing").await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn update_rejects_blank_title_without_writing() {
        let store = store().await;
        let created = store.create(NewTask::titled("Keep me")).await.unwrap();

        let err = store
            .update(
                &created.id,
                TaskUpdate {
                    title: Some(" ".into()),
                    ..TaskUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Keep me");
    }

    #[tokio::test]
    async fn delete_removes_task_and_audits_snapshot() {
        let store = store().await;
        let created = store.create(NewTask::titled("Temporary")).await.unwrap();

        store.delete(&created.id).await.unwrap();

        assert!(store.get(&created.id).await.unwrap().is_none());
        assert_eq!(audit_actions(&store, &created.id).await, vec!["create", "delete"]);
    }

    #[tokio::test]
    async fn list_filters_and_stats_count() {
        let store = store().await;
        for (title, priority) in [
            ("a", TaskPriority::High),
            ("b", TaskPriority::High),
            ("c", TaskPriority::Low),
        ] {
            store
                .create(NewTask {
                    title: title.into(),
                    priority: Some(priority),
                    ..NewTask::default()
                })
                .await
                .unwrap();
        }

        let high = store
            .list(&TaskFilter {
                priority: Some(TaskPriority::High),
                ..TaskFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(high.len(), 2);
        assert_eq!(high[0].title, "b");

        let limited = store
            .list(&TaskFilter {
                limit: Some(1),
                ..TaskFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_priority.get("high"), Some(&2));
        assert_eq!(stats.by_priority.get("low"), Some(&1));
        assert_eq!(stats.by_status.get("pending"), Some(&3));
    }

    #[tokio::test]
    async fn unreadable_row_is_a_corrupt_record() {
        let store = store().await;
        let created = store.create(NewTask::titled("Tagged")).await.unwrap();
        sqlx::query("UPDATE tasks SET tags = 'not json' WHERE id = ?")
            .bind(&created.id)
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get(&created.id).await.unwrap_err();
        assert!(matches!(err, Error::CorruptRecord(ref msg) if msg.contains("tags")));
        assert!(err.is_infrastructure());
    }
}
