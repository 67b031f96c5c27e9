/// Record store abstraction
///
/// Key-value persistence of JSON records addressed by (collection, id).
/// The engine only lists, reads and updates; create and delete belong to
/// whatever manages check definitions.
pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Collection holding check records
pub const CHECKS: &str = "checks";

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record, failing if it already exists
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Read a record
    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace the whole content of an existing record
    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Delete a record
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// List the ids in a collection
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError>;
}
