use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult, TaskStore, UserStore};
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};
use crate::models::user::{normalize_email, CreateUser, User};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    /// normalized email -> user id
    emails: HashMap<String, Uuid>,
    /// Insertion order doubles as creation order
    tasks: Vec<Task>,
}

/// In-memory store for tests and `STORAGE_BACKEND=memory`
///
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a user's active flag; returns `false` for an unknown user
    pub async fn set_user_active(&self, id: Uuid, active: bool) -> bool {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Removes a user and, like the foreign key cascade, their tasks
    pub async fn remove_user(&self, id: Uuid) -> bool {
        let mut state = self.state.write().await;
        let Some(user) = state.users.remove(&id) else {
            return false;
        };
        state.emails.remove(&normalize_email(&user.email));
        state.tasks.retain(|t| t.owner_id != id);
        true
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let key = normalize_email(&data.email);
        let mut state = self.state.write().await;

        if state.emails.contains_key(&key) {
            return Err(StoreError::Duplicate("user with this email".to_string()));
        }

        let user = User::new(data);
        state.emails.insert(key, user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .emails
            .get(&normalize_email(email))
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self, owner: Uuid, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;

        let matching = state
            .tasks
            .iter()
            .rev()
            .filter(|t| t.owner_id == owner && filter.matches(t))
            .skip(filter.effective_offset() as usize)
            .cloned();

        Ok(match filter.effective_limit() {
            Some(limit) => matching.take(limit as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn create_task(&self, owner: Uuid, data: NewTask) -> StoreResult<Task> {
        let task = Task::new(owner, data);
        self.state.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self
            .state
            .read()
            .await
            .tasks
            .iter()
            .find(|t| t.id == id && t.owner_id == owner)
            .cloned())
    }

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        Ok(state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner)
            .map(|task| {
                task.apply(changes);
                task.clone()
            }))
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.tasks.len();
        state.tasks.retain(|t| !(t.id == id && t.owner_id == owner));
        Ok(state.tasks.len() != before)
    }
}
