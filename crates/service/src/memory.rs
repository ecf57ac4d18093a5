use std::sync::Arc;

use models::User;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::ServiceError;
use crate::store::UserStore;

#[derive(Default)]
struct UserTable {
    users: Vec<User>,
    next_id: u64,
}

impl UserTable {
    fn position(&self, id: u64) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }
}

/// In-memory user collection. Insertion order is preserved and ids are
/// strictly increasing for the process lifetime; deleted ids are never
/// reused. All contents are lost on restart.
#[derive(Clone)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<UserTable>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(UserTable { users: Vec::new(), next_id: 1 })) }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, body: Value) -> User {
        let mut table = self.inner.write().await;
        let id = table.next_id;
        table.next_id += 1;
        let user = User::from_value(id, body);
        table.users.push(user.clone());
        debug!(id, total = table.users.len(), "user created");
        user
    }

    async fn list(&self) -> Vec<User> {
        let table = self.inner.read().await;
        table.users.clone()
    }

    async fn get(&self, id: u64) -> Result<User, ServiceError> {
        let table = self.inner.read().await;
        table
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    async fn update(&self, id: u64, body: Value) -> Result<User, ServiceError> {
        let mut table = self.inner.write().await;
        let idx = table.position(id).ok_or_else(|| ServiceError::not_found("user"))?;
        let user = User::from_value(id, body);
        table.users[idx] = user.clone();
        debug!(id, "user replaced");
        Ok(user)
    }

    async fn delete(&self, id: u64) -> Result<(), ServiceError> {
        let mut table = self.inner.write().await;
        let idx = table.position(id).ok_or_else(|| ServiceError::not_found("user"))?;
        table.users.remove(idx);
        debug!(id, total = table.users.len(), "user deleted");
        Ok(())
    }
}
