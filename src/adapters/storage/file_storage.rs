use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::errors::{KeyringError, Result};
use crate::core::traits::storage::{Storage, StorageOp};

/// File-based storage that keeps all records in one JSON document.
///
/// A commit rewrites the document into a temporary file next to it and
/// renames it into place, so readers see either the old or the new
/// document, never a mix.
///
/// Example `store.json`:
/// ```text
/// {
///   "keyring.attributes": { "main": { "default_key": "771f…9763" } },
///   "keyring.main.public_keys": [ … ],
///   "keyring.main.private_keys": [ … ]
/// }
/// ```
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create a storage backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Return the file path this storage reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<serde_json::Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }

        match serde_json::from_str(&content).map_err(|e| KeyringError::Storage {
            detail: format!("Malformed storage file {}: {e}", self.path.display()),
        })? {
            Value::Object(map) => Ok(map),
            _ => Err(KeyringError::Storage {
                detail: format!("Storage file {} is not a JSON object", self.path.display()),
            }),
        }
    }

    /// Write the document to a temp file in the same directory, then
    /// rename it over the target.
    fn write_document(path: &Path, document: &Value) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, document)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| KeyringError::Storage {
            detail: format!("Failed to replace {}: {}", path.display(), e.error),
        })?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_document().await?.remove(key))
    }

    async fn commit(&self, ops: Vec<StorageOp>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        let count = ops.len();
        for op in ops {
            match op {
                StorageOp::Set { key, value } => {
                    document.insert(key, value);
                }
                StorageOp::Remove { key } => {
                    document.remove(&key);
                }
            }
        }

        let path = self.path.clone();
        let document = Value::Object(document);
        tokio::task::spawn_blocking(move || Self::write_document(&path, &document))
            .await
            .map_err(|e| KeyringError::Storage {
                detail: format!("Storage write task failed: {e}"),
            })??;

        debug!(path = %self.path.display(), ops = count, "storage committed");
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
