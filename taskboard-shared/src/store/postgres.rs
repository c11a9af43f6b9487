use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, StoreResult, TaskStore, UserStore};
use crate::db::pool::health_check;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};
use crate::models::user::{CreateUser, User};

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| StoreError::from_sqlx(e, "user with this email"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(&self, owner: Uuid, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, owner, filter).await?)
    }

    async fn create_task(&self, owner: Uuid, data: NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, owner, data).await?)
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id_and_owner(&self.pool, id, owner).await?)
    }

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update_for_owner(&self.pool, id, owner, changes).await?)
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete_for_owner(&self.pool, id, owner).await?)
    }
}
