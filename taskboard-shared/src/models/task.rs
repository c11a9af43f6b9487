/// Task model and database operations
///
/// A task is a personal to-do item. Every task has exactly one owner, assigned
/// from the authenticated user at creation time and never changed afterwards.
///
/// Every query in this module that reads or writes an existing task takes the
/// owner ID and filters on it in the same statement. A task owned by someone
/// else is indistinguishable from a task that doesn't exist.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'DOING', 'DONE');
/// CREATE TYPE task_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'TODO',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     due_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{Task, NewTask};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(owner: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, owner, NewTask::titled("Buy milk")).await?;
///
/// // Someone else asking for the same ID gets nothing back
/// let other = Task::find_by_id_and_owner(&pool, task.id, Uuid::new_v4()).await?;
/// assert!(other.is_none());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum length of a task title, in characters
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum page size for task listings
pub const MAX_PAGE_SIZE: i64 = 100;

const TASK_COLUMNS: &str =
    "id, owner_id, title, description, status, priority, due_date, created_at, updated_at";

/// Workflow status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::Doing => "DOING",
            TaskStatus::Done => "DONE",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

/// Task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning user, exposed as `owner` in JSON
    #[serde(rename = "owner")]
    pub owner_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// There is no owner field: the owner is always passed separately and comes
/// from the authenticated identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// Task with only a title, everything else defaulted
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Changes to an existing task
///
/// `None` leaves a field untouched. For nullable fields, `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

/// Optional narrowing and pagination for task listings
///
/// Filters only ever narrow the caller's own tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskFilter {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn effective_limit(&self) -> Option<i64> {
        self.limit.map(|limit| limit.clamp(1, MAX_PAGE_SIZE))
    }

    /// Offset, never negative
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Whether a task passes the status and priority filters
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
    }
}

impl Task {
    /// Builds a new task for `owner` with defaults applied, without touching the
    /// database
    pub fn new(owner_id: Uuid, data: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: data.title,
            description: data.description,
            status: data.status.unwrap_or_default(),
            priority: data.priority.unwrap_or_default(),
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies changes in place and bumps `updated_at`
    ///
    /// Identity fields (`id`, `owner_id`, `created_at`) are never touched.
    pub fn apply(&mut self, changes: TaskChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        self.updated_at = Utc::now();
    }

    /// Creates a task owned by `owner_id`
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: NewTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (owner_id, title, description, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status.unwrap_or_default())
            .bind(data.priority.unwrap_or_default())
            .bind(data.due_date)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID, only if `owner_id` owns it
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the owner's tasks, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE owner_id = $1
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::task_priority IS NULL OR priority = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner_id)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(filter.effective_limit())
            .bind(filter.effective_offset())
            .fetch_all(pool)
            .await
    }

    /// Updates a task owned by `owner_id`
    ///
    /// Returns `None` when no such task belongs to the owner. Empty changes still
    /// bump `updated_at` so the caller gets the current row back.
    pub async fn update_for_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if changes.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if changes.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if changes.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if changes.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if changes.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 AND owner_id = $2 RETURNING ");
        query.push_str(TASK_COLUMNS);

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(owner_id);

        if let Some(title) = changes.title {
            q = q.bind(title);
        }
        if let Some(description) = changes.description {
            q = q.bind(description);
        }
        if let Some(status) = changes.status {
            q = q.bind(status);
        }
        if let Some(priority) = changes.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = changes.due_date {
            q = q.bind(due_date);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a task owned by `owner_id`
    ///
    /// Returns `false` when no such task belongs to the owner.
    pub async fn delete_for_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(serde_json::to_value(TaskStatus::Doing).unwrap(), "DOING");
        assert_eq!(serde_json::to_value(TaskPriority::High).unwrap(), "HIGH");
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"DONE\"").unwrap(),
            TaskStatus::Done
        );
        assert!(serde_json::from_str::<TaskStatus>("\"done\"").is_err());
        assert_eq!(TaskStatus::Todo.as_str(), "TODO");
        assert_eq!(TaskPriority::Low.as_str(), "LOW");
    }

    #[test]
    fn test_new_task_defaults() {
        let owner = Uuid::new_v4();
        let task = Task::new(owner, NewTask::titled("Buy milk"));

        assert_eq!(task.owner_id, owner);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.description.is_none());
        assert!(task.due_date.is_none());
    }

    #[test]
    fn test_apply_changes() {
        let owner = Uuid::new_v4();
        let mut task = Task::new(
            owner,
            NewTask {
                description: Some("2 litres".to_string()),
                ..NewTask::titled("Buy milk")
            },
        );
        let id = task.id;
        let created_at = task.created_at;

        task.apply(TaskChanges {
            status: Some(TaskStatus::Done),
            description: Some(None),
            due_date: Some(NaiveDate::from_ymd_opt(2030, 1, 2)),
            ..TaskChanges::default()
        });

        assert_eq!(task.id, id);
        assert_eq!(task.owner_id, owner);
        assert_eq!(task.created_at, created_at);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.description.is_none());
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2030, 1, 2));
        assert!(task.updated_at >= created_at);
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(TaskChanges::default().is_empty());
        assert!(!TaskChanges {
            description: Some(None),
            ..TaskChanges::default()
        }
        .is_empty());
    }

    #[test]
    fn test_filter() {
        let task = Task::new(Uuid::new_v4(), NewTask::titled("x"));

        assert!(TaskFilter::default().matches(&task));
        assert!(TaskFilter {
            status: Some(TaskStatus::Todo),
            ..TaskFilter::default()
        }
        .matches(&task));
        assert!(!TaskFilter {
            priority: Some(TaskPriority::High),
            ..TaskFilter::default()
        }
        .matches(&task));

        let paging = TaskFilter {
            limit: Some(1000),
            offset: Some(-5),
            ..TaskFilter::default()
        };
        assert_eq!(paging.effective_limit(), Some(MAX_PAGE_SIZE));
        assert_eq!(paging.effective_offset(), 0);
        assert_eq!(TaskFilter::default().effective_limit(), None);
    }

    #[test]
    fn test_task_json_shape() {
        let task = Task::new(Uuid::new_v4(), NewTask::titled("Buy milk"));
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["owner"], task.owner_id.to_string());
        assert_eq!(json["status"], "TODO");
        assert_eq!(json["priority"], "MEDIUM");
        assert!(json["description"].is_null());
        assert!(json.get("owner_id").is_none());
    }
}
