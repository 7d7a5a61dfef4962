use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::core::errors::{KeyringError, Result};
use crate::core::models::attributes::AttributeMap;
use crate::core::traits::storage::{Storage, StorageOp};

/// Storage record mapping keyring id → attribute map.
pub const ATTRIBUTES_RECORD: &str = "keyring.attributes";

/// Serialized access to the single persisted attribute record.
///
/// Every keyring's attributes live in one record, so writers for different
/// keyrings still read-modify-write the same value. The lock keeps those
/// writes from losing each other's updates.
pub struct AttributeStore {
    storage: Arc<dyn Storage>,
    lock: Mutex<()>,
}

impl AttributeStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// All keyring ids with their attributes, in creation order.
    pub async fn load(&self) -> Result<Vec<(String, AttributeMap)>> {
        let record = self.read_record().await?;
        record
            .into_iter()
            .map(|(id, attrs)| match attrs {
                Value::Object(map) => Ok((id, map)),
                other => Err(KeyringError::Storage {
                    detail: format!("Attributes of keyring '{id}' are not a map: {other}"),
                }),
            })
            .collect()
    }

    /// Store `attrs` for `id`, committing `extra` in the same batch.
    pub async fn put(&self, id: &str, attrs: &AttributeMap, extra: Vec<StorageOp>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut record = self.read_record().await?;
        record.insert(id.to_string(), Value::Object(attrs.clone()));
        self.write_record(record, extra).await
    }

    /// Drop `id` from the record, committing `extra` in the same batch.
    pub async fn remove(&self, id: &str, extra: Vec<StorageOp>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let record = self
            .read_record()
            .await?
            .into_iter()
            .filter(|(existing, _)| existing != id)
            .collect();
        self.write_record(record, extra).await
    }

    async fn read_record(&self) -> Result<serde_json::Map<String, Value>> {
        match self.storage.get(ATTRIBUTES_RECORD).await? {
            None => Ok(serde_json::Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(KeyringError::Storage {
                detail: format!("Record '{ATTRIBUTES_RECORD}' is not a map: {other}"),
            }),
        }
    }

    async fn write_record(
        &self,
        record: serde_json::Map<String, Value>,
        extra: Vec<StorageOp>,
    ) -> Result<()> {
        let mut ops = Vec::with_capacity(extra.len() + 1);
        ops.push(StorageOp::Set {
            key: ATTRIBUTES_RECORD.to_string(),
            value: Value::Object(record),
        });
        ops.extend(extra);
        self.storage.commit(ops).await
    }
}
