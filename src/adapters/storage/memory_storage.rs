use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::core::errors::Result;
use crate::core::traits::storage::{Storage, StorageOp};

/// Storage that keeps every record in process memory.
///
/// Nothing survives the process; used for tests and throwaway registries.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn commit(&self, ops: Vec<StorageOp>) -> Result<()> {
        let mut records = self.records.write().await;
        for op in ops {
            match op {
                StorageOp::Set { key, value } => {
                    records.insert(key, value);
                }
                StorageOp::Remove { key } => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
