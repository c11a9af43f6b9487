/// Task endpoints
///
/// Every handler is scoped to the authenticated caller. The owner is always
/// taken from the identity, never from the request body, and a task that
/// belongs to someone else answers exactly like a task that doesn't exist
/// (404).
///
/// # Endpoints
///
/// - `GET    /api/tasks/` - List own tasks, newest first
/// - `POST   /api/tasks/` - Create a task
/// - `GET    /api/tasks/:id/` - Retrieve
/// - `PUT    /api/tasks/:id/` - Update, title required
/// - `PATCH  /api/tasks/:id/` - Partial update
/// - `DELETE /api/tasks/:id/` - Delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::models::task::{
    NewTask, Task, TaskChanges, TaskFilter, TaskPriority, TaskStatus, MAX_TITLE_LENGTH,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
};

/// Task fields accepted from clients
///
/// Unknown fields (including `owner`, `id` and the timestamps) are ignored.
/// For `description` and `due_date`, an explicit `null` clears the value while
/// an absent field leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Distinguishes `"field": null` (`Some(None)`) from a missing field (`None`)
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn validate_title(title: &str) -> ApiResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid("title", "This field may not be blank."));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::invalid(
            "title",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_TITLE_LENGTH
            ),
        ));
    }
    Ok(trimmed.to_string())
}

fn required_title(title: Option<&str>) -> ApiResult<String> {
    match title {
        Some(title) => validate_title(title),
        None => Err(ApiError::invalid("title", "This field is required.")),
    }
}

impl TaskPayload {
    fn into_new_task(self) -> ApiResult<NewTask> {
        Ok(NewTask {
            title: required_title(self.title.as_deref())?,
            description: self.description.flatten(),
            status: self.status,
            priority: self.priority,
            due_date: self.due_date.flatten(),
        })
    }

    fn into_changes(self, title_required: bool) -> ApiResult<TaskChanges> {
        let title = if title_required {
            Some(required_title(self.title.as_deref())?)
        } else {
            self.title.as_deref().map(validate_title).transpose()?
        };

        Ok(TaskChanges {
            title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
        })
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListQuery> for TaskFilter {
    fn from(query: ListQuery) -> Self {
        TaskFilter {
            status: query.status,
            priority: query.priority,
            limit: query.limit,
            offset: query.offset,
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Malformed ids can't name an owned task, so they are a plain 404
fn parse_task_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

/// List the caller's tasks
///
/// ```text
/// GET /api/tasks/?status=TODO&priority=HIGH&limit=20&offset=0
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.tasks.list_tasks(auth.user_id(), query.into()).await?;

    debug!(user_id = %auth.user_id(), count = tasks.len(), "Listed tasks");

    Ok(Json(tasks))
}

/// Create a task owned by the caller
///
/// ```text
/// POST /api/tasks/
///
/// { "title": "Buy milk", "priority": "HIGH", "due_date": "2025-06-01" }
/// ```
///
/// Omitted `status`/`priority` default to `TODO`/`MEDIUM`.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let data = payload.into_new_task()?;
    let task = state.tasks.create_task(auth.user_id(), data).await?;

    info!(user_id = %auth.user_id(), task_id = %task.id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;

    let task = state
        .tasks
        .find_task(auth.user_id(), id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %auth.user_id(), task_id = %id, "Task not found for caller");
            not_found()
        })?;

    Ok(Json(task))
}

/// Full update (`title` required, omitted optional fields keep their values)
pub async fn replace_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let changes = payload.into_changes(true)?;
    apply_changes(&state, &auth, id, changes).await
}

/// Partial update
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let changes = payload.into_changes(false)?;
    apply_changes(&state, &auth, id, changes).await
}

async fn apply_changes(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    changes: TaskChanges,
) -> ApiResult<Json<Task>> {
    let task = state
        .tasks
        .update_task(auth.user_id(), id, changes)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %auth.user_id(), task_id = %id, "Update of task not owned by caller");
            not_found()
        })?;

    info!(user_id = %auth.user_id(), task_id = %task.id, "Task updated");

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_task_id(&id)?;

    if !state.tasks.delete_task(auth.user_id(), id).await? {
        warn!(user_id = %auth.user_id(), task_id = %id, "Delete of task not owned by caller");
        return Err(not_found());
    }

    info!(user_id = %auth.user_id(), task_id = %id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}
