use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::core::errors::{KeyringError, Result};
use crate::core::models::attributes::AttributeMap;
use crate::core::models::key::{Key, KeyBundle, KeyData};
use crate::core::services::attribute_store::AttributeStore;
use crate::core::services::key_store::{KeyStore, private_keys_record, public_keys_record};
use crate::core::services::validation::{normalize_key_ids, validate_keyring_id};
use crate::core::traits::storage::{Storage, StorageOp};

/// Default id of the main keyring.
pub const MAIN_KEYRING_ID: &str = "main";

/// Rule for picking the keyring used when a caller names none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PreferredKeyring {
    /// Most recently created non-main keyring holding a private key,
    /// otherwise the main keyring.
    #[default]
    LatestWithPrivateKey,
    /// Always the main keyring.
    Main,
    /// A fixed keyring id.
    Keyring(String),
}

impl FromStr for PreferredKeyring {
    type Err = KeyringError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest-private" => Ok(Self::LatestWithPrivateKey),
            "main" => Ok(Self::Main),
            other => match other.strip_prefix("keyring:") {
                Some(id) => Ok(Self::Keyring(validate_keyring_id(id)?.to_string())),
                None => Err(KeyringError::InvalidConfig {
                    detail: format!(
                        "Unknown preferred keyring policy '{other}'. \
                         Use 'latest-private', 'main' or 'keyring:<id>'."
                    ),
                }),
            },
        }
    }
}

impl fmt::Display for PreferredKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestWithPrivateKey => write!(f, "latest-private"),
            Self::Main => write!(f, "main"),
            Self::Keyring(id) => write!(f, "keyring:{id}"),
        }
    }
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub main_keyring_id: String,
    pub preferred: PreferredKeyring,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            main_keyring_id: MAIN_KEYRING_ID.to_string(),
            preferred: PreferredKeyring::default(),
        }
    }
}

/// Outcome of a public key synchronization, per requested key ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Fingerprints copied into the destination.
    pub copied: Vec<String>,
    /// Fingerprints the destination already held.
    pub already_present: Vec<String>,
    /// Key IDs no keyring could provide.
    pub not_found: Vec<String>,
}

/// Owns every keyring of the process and answers cross-keyring queries.
///
/// Enumeration order is creation order and stays stable for the lifetime
/// of the registry.
pub struct KeyringRegistry {
    config: RegistryConfig,
    attribute_store: Arc<AttributeStore>,
    keyrings: RwLock<Vec<Arc<KeyStore>>>,
    lifecycle: Mutex<()>,
    initialized: OnceCell<()>,
}

impl KeyringRegistry {
    pub fn new(storage: Arc<dyn Storage>, config: RegistryConfig) -> Self {
        Self {
            config,
            attribute_store: Arc::new(AttributeStore::new(storage)),
            keyrings: RwLock::new(Vec::new()),
            lifecycle: Mutex::new(()),
            initialized: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn main_keyring_id(&self) -> &str {
        &self.config.main_keyring_id
    }

    /// Load every persisted keyring. Runs once; later calls return at once.
    ///
    /// Storage without a main keyring gets one created and persisted.
    pub async fn init(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| self.load_all())
            .await
            .map(|_| ())
    }

    async fn load_all(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        let mut loaded = Vec::new();
        for (id, attrs) in self.attribute_store.load().await? {
            let store = KeyStore::load(&id, self.attribute_store.clone(), attrs).await?;
            loaded.push(Arc::new(store));
        }

        if !loaded.iter().any(|k| k.id() == self.config.main_keyring_id) {
            // Appended last, matching its position in the persisted record.
            let main = self.persist_new_keyring(&self.config.main_keyring_id).await?;
            loaded.push(main);
        }

        info!(
            count = loaded.len(),
            storage = self.attribute_store.storage().name(),
            "keyrings loaded"
        );
        *self.keyrings.write().await = loaded;
        Ok(())
    }

    /// Create an empty keyring with default attributes.
    pub async fn create_keyring(&self, id: &str) -> Result<Arc<KeyStore>> {
        validate_keyring_id(id)?;
        let _guard = self.lifecycle.lock().await;
        if self.find(id).await.is_some() {
            return Err(KeyringError::DuplicateKeyring { id: id.to_string() });
        }

        let store = self.persist_new_keyring(id).await?;
        self.keyrings.write().await.push(store.clone());
        info!(keyring = id, "created keyring");
        Ok(store)
    }

    /// Remove a keyring with all its keys and attributes in one commit.
    pub async fn delete_keyring(&self, id: &str) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        let store = self.get_by_id(id).await?;

        store.delete().await?;
        self.keyrings.write().await.retain(|k| k.id() != id);
        info!(keyring = id, "deleted keyring");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Arc<KeyStore>> {
        self.find(id)
            .await
            .ok_or_else(|| KeyringError::KeyringNotFound { id: id.to_string() })
    }

    /// All keyrings in creation order.
    pub async fn get_all(&self) -> Vec<Arc<KeyStore>> {
        self.keyrings.read().await.clone()
    }

    /// Snapshot of every keyring's attributes.
    pub async fn get_all_keyring_attr(&self) -> BTreeMap<String, AttributeMap> {
        let mut all = BTreeMap::new();
        for store in self.get_all().await {
            all.insert(store.id().to_string(), store.attributes().await);
        }
        all
    }

    pub async fn get_keyring_attr(&self, id: &str, name: &str) -> Result<Option<Value>> {
        Ok(self.get_by_id(id).await?.get_attribute(name).await)
    }

    /// Merge `attrs` into the keyring's attributes.
    pub async fn set_keyring_attr(&self, id: &str, attrs: AttributeMap) -> Result<()> {
        self.get_by_id(id).await?.import_attributes(attrs).await
    }

    pub async fn get_key_data(&self, id: &str) -> Result<Vec<KeyData>> {
        Ok(self.get_by_id(id).await?.get_key_data().await)
    }

    pub async fn get_key_by_address<S: AsRef<str>>(
        &self,
        id: &str,
        addresses: &[S],
    ) -> Result<BTreeMap<String, Vec<Key>>> {
        Ok(self.get_by_id(id).await?.get_key_by_address(addresses).await)
    }

    /// First keyring, in enumeration order, holding private keys for all
    /// of `key_ids`.
    pub async fn get_keyring_with_priv_key<S: AsRef<str>>(
        &self,
        key_ids: &[S],
    ) -> Result<Arc<KeyStore>> {
        for store in self.get_all().await {
            if store.has_private_keys_for(key_ids).await {
                debug!(keyring = store.id(), "private key owner found");
                return Ok(store);
            }
        }

        Err(KeyringError::KeyNotFound {
            id: key_ids
                .iter()
                .map(|id| id.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// The keyring picked by the configured `PreferredKeyring` rule.
    pub async fn get_preferred_keyring(&self) -> Result<Arc<KeyStore>> {
        match &self.config.preferred {
            PreferredKeyring::Main => self.get_by_id(&self.config.main_keyring_id).await,
            PreferredKeyring::Keyring(id) => self.get_by_id(id).await,
            PreferredKeyring::LatestWithPrivateKey => {
                for store in self.get_all().await.into_iter().rev() {
                    if store.id() != self.config.main_keyring_id && store.has_private_keys().await
                    {
                        return Ok(store);
                    }
                }
                self.get_by_id(&self.config.main_keyring_id).await
            }
        }
    }

    /// Copy public keys for `key_ids` from any keyring into `keyring_id`.
    ///
    /// A key held only as a private record is shared through its public
    /// part. Best effort per key: an unknown key ID is skipped, a
    /// fingerprint the destination already holds in either set is left
    /// alone, and each copied key is committed on its own.
    pub async fn sync_public_keys<S: AsRef<str>>(
        &self,
        keyring_id: &str,
        key_ids: &[S],
    ) -> Result<SyncReport> {
        let key_ids = normalize_key_ids(key_ids)?;
        let destination = self.get_by_id(keyring_id).await?;
        let keyrings = self.get_all().await;
        let mut report = SyncReport::default();

        for key_id in key_ids {
            let mut source_key = None;
            for store in &keyrings {
                if let Some(key) = store.find_public_key(&key_id).await {
                    source_key = Some(key);
                    break;
                }
            }

            let Some(key) = source_key else {
                warn!(keyring = keyring_id, %key_id, "no keyring holds this key, skipping");
                report.not_found.push(key_id);
                continue;
            };

            if destination.has_key(&key.fingerprint).await {
                report.already_present.push(key.fingerprint);
                continue;
            }

            let fingerprint = key.fingerprint.clone();
            let summary = destination
                .import_keys(KeyBundle {
                    public: vec![key],
                    private: vec![],
                })
                .await?;
            if summary.added.is_empty() {
                report.already_present.push(fingerprint);
            } else {
                report.copied.push(fingerprint);
            }
        }

        info!(
            keyring = keyring_id,
            copied = report.copied.len(),
            skipped = report.not_found.len(),
            "synchronized public keys"
        );
        Ok(report)
    }

    async fn find(&self, id: &str) -> Option<Arc<KeyStore>> {
        self.keyrings
            .read()
            .await
            .iter()
            .find(|k| k.id() == id)
            .cloned()
    }

    /// Commit an empty keyring (attributes + key records) in one batch.
    async fn persist_new_keyring(&self, id: &str) -> Result<Arc<KeyStore>> {
        let attrs = AttributeMap::new();
        self.attribute_store
            .put(
                id,
                &attrs,
                vec![
                    StorageOp::Set {
                        key: public_keys_record(id),
                        value: Value::Array(vec![]),
                    },
                    StorageOp::Set {
                        key: private_keys_record(id),
                        value: Value::Array(vec![]),
                    },
                ],
            )
            .await?;
        Ok(Arc::new(KeyStore::empty(
            id,
            self.attribute_store.clone(),
            attrs,
        )))
    }
}
