/// Storage traits for users and tasks
///
/// Handlers and the authenticator never talk to a database directly. They go
/// through [`UserStore`] and [`TaskStore`], which have two implementations:
///
/// - [`postgres::PgStore`]: PostgreSQL through sqlx, used in production
/// - [`memory::MemoryStore`]: in-process maps, used by tests and local runs
///
/// Every [`TaskStore`] method takes the owner as its first argument. There is
/// no way to reach a task without naming its owner, so a foreign task and a
/// missing task come back the same way (`None` / `false`).

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated (e.g. email already registered)
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a unique-violation database error to `Duplicate(what)`, passing
    /// other errors through
    pub fn from_sqlx(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(what.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user, failing with `Duplicate` when the email (ignoring case) is taken
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Records a successful login
    async fn record_login(&self, id: Uuid) -> StoreResult<()>;

    /// Liveness check for health reporting
    async fn ping(&self) -> StoreResult<()>;
}

/// Owner-scoped task storage
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The owner's tasks, newest first, narrowed by `filter`
    async fn list_tasks(&self, owner: Uuid, filter: TaskFilter) -> StoreResult<Vec<Task>>;

    /// Creates a task owned by `owner`
    async fn create_task(&self, owner: Uuid, data: NewTask) -> StoreResult<Task>;

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    /// Applies `changes`; `None` if `owner` has no task `id`
    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>>;

    /// `false` if `owner` has no task `id`
    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
}
