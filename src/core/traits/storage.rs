use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::Result;

/// One write in a storage batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageOp {
    Set { key: String, value: Value },
    Remove { key: String },
}

/// Port for durable keyring records.
///
/// Implementations live in `adapters::storage` (e.g. MemoryStorage,
/// FileStorage). Records are JSON values under string keys.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a record, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Apply every operation or none of them.
    async fn commit(&self, ops: Vec<StorageOp>) -> Result<()>;

    /// Write a single record.
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.commit(vec![StorageOp::Set {
            key: key.to_string(),
            value,
        }])
        .await
    }

    /// Human-readable name of this backend (e.g. "memory", "file").
    fn name(&self) -> &str;
}
