use models::User;
use serde_json::Value;

use crate::errors::ServiceError;

/// CRUD interface over the user collection. Implementations are chosen at
/// startup and injected into the router state as `Arc<dyn UserStore>`.
/// Bodies are arbitrary JSON; no shape is enforced.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Assign the next id, append the record, and return it.
    async fn create(&self, body: Value) -> User;
    /// All records in insertion order.
    async fn list(&self) -> Vec<User>;
    async fn get(&self, id: u64) -> Result<User, ServiceError>;
    /// Replace the record's fields wholesale, keeping the given id.
    async fn update(&self, id: u64, body: Value) -> Result<User, ServiceError>;
    async fn delete(&self, id: u64) -> Result<(), ServiceError>;
}
