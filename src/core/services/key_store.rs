use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::core::errors::{KeyringError, Result};
use crate::core::models::attributes::{AttributeMap, DEFAULT_KEY_ATTR};
use crate::core::models::key::{Key, KeyBundle, KeyData, KeyMaterial};
use crate::core::services::attribute_store::AttributeStore;
use crate::core::services::validation::{
    normalize_fingerprint, normalize_key_id, normalize_key_ids,
};
use crate::core::traits::storage::{Storage, StorageOp};

/// Storage record holding a keyring's public keys.
pub fn public_keys_record(keyring_id: &str) -> String {
    format!("keyring.{keyring_id}.public_keys")
}

/// Storage record holding a keyring's private keys.
pub fn private_keys_record(keyring_id: &str) -> String {
    format!("keyring.{keyring_id}.private_keys")
}

/// Fingerprints touched by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: Vec<String>,
    /// Already present in the target set; left untouched.
    pub unchanged: Vec<String>,
}

#[derive(Default)]
struct KeyStoreState {
    public: Vec<Key>,
    private: Vec<Key>,
    attributes: AttributeMap,
    deleted: bool,
}

impl KeyStoreState {
    fn ensure_live(&self, id: &str) -> Result<()> {
        if self.deleted {
            return Err(KeyringError::KeyringNotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn all_keys(&self) -> impl Iterator<Item = &Key> {
        self.public.iter().chain(self.private.iter())
    }
}

/// One keyring: its public and private key sets plus attributes.
///
/// Mutations are serialized per keyring and become visible only after the
/// storage commit succeeds. Readers always see a complete state.
pub struct KeyStore {
    id: String,
    attribute_store: Arc<AttributeStore>,
    state: RwLock<KeyStoreState>,
    write_lock: Mutex<()>,
}

impl KeyStore {
    /// An empty keyring with the given attributes. Nothing is persisted.
    pub(crate) fn empty(
        id: &str,
        attribute_store: Arc<AttributeStore>,
        attributes: AttributeMap,
    ) -> Self {
        Self {
            id: id.to_string(),
            attribute_store,
            state: RwLock::new(KeyStoreState {
                attributes,
                ..KeyStoreState::default()
            }),
            write_lock: Mutex::new(()),
        }
    }

    /// Load a persisted keyring's key sets.
    pub(crate) async fn load(
        id: &str,
        attribute_store: Arc<AttributeStore>,
        attributes: AttributeMap,
    ) -> Result<Self> {
        let storage = attribute_store.storage().clone();
        let public = read_keys(storage.get(&public_keys_record(id)).await?, false)?;
        let private = read_keys(storage.get(&private_keys_record(id)).await?, true)?;
        debug!(
            keyring = id,
            public = public.len(),
            private = private.len(),
            "loaded keyring"
        );

        Ok(Self {
            id: id.to_string(),
            attribute_store,
            state: RwLock::new(KeyStoreState {
                public,
                private,
                attributes,
                deleted: false,
            }),
            write_lock: Mutex::new(()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merge key material into this keyring.
    ///
    /// A fingerprint already present in the matching set is left as is,
    /// so importing the same bundle twice changes nothing.
    pub async fn import_keys(&self, bundle: KeyBundle) -> Result<ImportSummary> {
        let _guard = self.write_lock.lock().await;
        let (mut public, mut private) = {
            let state = self.state.read().await;
            state.ensure_live(&self.id)?;
            (state.public.clone(), state.private.clone())
        };

        let mut summary = ImportSummary::default();
        for key in bundle.public {
            let key = checked_key(key, false)?;
            merge_key(&mut public, key, &mut summary);
        }
        for key in bundle.private {
            let key = checked_key(key, true)?;
            merge_key(&mut private, key, &mut summary);
        }

        if summary.added.is_empty() {
            debug!(keyring = %self.id, "import changed nothing");
            return Ok(summary);
        }

        self.persist_keys(&public, &private).await?;
        let mut state = self.state.write().await;
        state.public = public;
        state.private = private;

        info!(
            keyring = %self.id,
            added = summary.added.len(),
            unchanged = summary.unchanged.len(),
            "imported keys"
        );
        Ok(summary)
    }

    /// Remove the public and private records for `fingerprint`.
    pub async fn remove_key(&self, fingerprint: &str) -> Result<()> {
        let fingerprint = normalize_fingerprint(fingerprint)?;
        let _guard = self.write_lock.lock().await;
        let (mut public, mut private) = {
            let state = self.state.read().await;
            state.ensure_live(&self.id)?;
            (state.public.clone(), state.private.clone())
        };

        let before = public.len() + private.len();
        public.retain(|k| k.fingerprint != fingerprint);
        private.retain(|k| k.fingerprint != fingerprint);
        if public.len() + private.len() == before {
            return Err(KeyringError::KeyNotFound { id: fingerprint });
        }

        self.persist_keys(&public, &private).await?;
        let mut state = self.state.write().await;
        state.public = public;
        state.private = private;

        info!(keyring = %self.id, %fingerprint, "removed key");
        Ok(())
    }

    /// Merge `attrs` into the attribute map; unspecified names are kept.
    pub async fn import_attributes(&self, attrs: AttributeMap) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut merged = {
            let state = self.state.read().await;
            state.ensure_live(&self.id)?;
            state.attributes.clone()
        };
        for (name, value) in attrs {
            merged.insert(name, value);
        }

        self.attribute_store.put(&self.id, &merged, vec![]).await?;
        self.state.write().await.attributes = merged;

        debug!(keyring = %self.id, "updated attributes");
        Ok(())
    }

    pub async fn set_attribute(&self, name: &str, value: Value) -> Result<()> {
        let mut attrs = AttributeMap::new();
        attrs.insert(name.to_string(), value);
        self.import_attributes(attrs).await
    }

    pub async fn get_attribute(&self, name: &str) -> Option<Value> {
        self.state.read().await.attributes.get(name).cloned()
    }

    /// Snapshot of the attribute map.
    pub async fn attributes(&self) -> AttributeMap {
        self.state.read().await.attributes.clone()
    }

    /// Fingerprint stored in the `default_key` attribute, if any.
    pub async fn default_key_fpr(&self) -> Option<String> {
        match self.get_attribute(DEFAULT_KEY_ATTR).await? {
            Value::String(fpr) if !fpr.is_empty() => Some(fpr),
            _ => None,
        }
    }

    /// Public keys followed by private keys.
    pub async fn get_all_keys(&self) -> Vec<Key> {
        self.state.read().await.all_keys().cloned().collect()
    }

    /// One listing record per user identity bound to each key.
    pub async fn get_key_data(&self) -> Vec<KeyData> {
        let state = self.state.read().await;
        state
            .all_keys()
            .flat_map(|key| {
                key.users().map(move |user| KeyData {
                    user_id: user.raw,
                    key_id: key.key_id().to_string(),
                    fingerprint: key.fingerprint.clone(),
                    email: user.email,
                    name: user.name,
                })
            })
            .collect()
    }

    /// Keys bound to each address, keyed by the address as passed in.
    ///
    /// Matching ignores case and surrounding whitespace. Public keys win;
    /// when none match, private keys for the address are returned.
    /// Addresses without any match, blank ones included, map to an empty
    /// list.
    pub async fn get_key_by_address<S: AsRef<str>>(
        &self,
        addresses: &[S],
    ) -> BTreeMap<String, Vec<Key>> {
        let state = self.state.read().await;
        let mut result = BTreeMap::new();

        for requested in addresses {
            let requested = requested.as_ref();
            let address = requested.trim().to_lowercase();
            if address.is_empty() {
                result.insert(requested.to_string(), Vec::new());
                continue;
            }

            let mut keys: Vec<Key> = state
                .public
                .iter()
                .filter(|k| k.has_address(&address))
                .cloned()
                .collect();
            if keys.is_empty() {
                keys = state
                    .private
                    .iter()
                    .filter(|k| k.has_address(&address))
                    .cloned()
                    .collect();
            }

            debug!(keyring = %self.id, %address, matches = keys.len(), "address lookup");
            result.insert(requested.to_string(), keys);
        }

        result
    }

    /// The single private key matching `ids`.
    ///
    /// Several IDs naming the same fingerprint are fine; IDs spread over two
    /// or more private keys fail with `AmbiguousKey`.
    pub async fn get_private_key_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<Key> {
        let ids = normalize_key_ids(ids)?;
        let state = self.state.read().await;

        let matches: Vec<&Key> = state
            .private
            .iter()
            .filter(|k| ids.iter().any(|id| k.matches_id(id)))
            .collect();

        match matches.as_slice() {
            [] => Err(KeyringError::KeyNotFound { id: ids.join(", ") }),
            [key] => Ok((*key).clone()),
            many => Err(KeyringError::AmbiguousKey {
                ids: ids.join(", "),
                fingerprints: many
                    .iter()
                    .map(|k| k.fingerprint.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Whether every ID in `ids` names one of this keyring's private keys.
    pub async fn has_private_keys_for<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        let Ok(ids) = normalize_key_ids(ids) else {
            return false;
        };
        let state = self.state.read().await;
        !ids.is_empty()
            && ids
                .iter()
                .all(|id| state.private.iter().any(|k| k.matches_id(id)))
    }

    pub async fn has_private_keys(&self) -> bool {
        !self.state.read().await.private.is_empty()
    }

    /// Public parts of the keys with exactly these fingerprints, in order.
    ///
    /// A fingerprint only held as a private key resolves through that
    /// record's public part. Any missing fingerprint fails the whole call.
    pub async fn get_keys_by_fprs<S: AsRef<str>>(&self, fingerprints: &[S]) -> Result<Vec<Key>> {
        let state = self.state.read().await;
        fingerprints
            .iter()
            .map(|fpr| {
                let fpr = normalize_fingerprint(fpr.as_ref())?;
                state
                    .public
                    .iter()
                    .find(|k| k.fingerprint == fpr)
                    .cloned()
                    .or_else(|| {
                        state
                            .private
                            .iter()
                            .find(|k| k.fingerprint == fpr)
                            .map(Key::to_public)
                    })
                    .ok_or(KeyringError::KeyNotFound { id: fpr })
            })
            .collect()
    }

    /// Fingerprint of the key (or the key owning the subkey) with `key_id`.
    pub async fn get_fpr_for_key_id(&self, key_id: &str) -> Result<String> {
        let key_id = normalize_key_id(key_id)?;
        let state = self.state.read().await;
        state
            .all_keys()
            .find(|k| k.matches_id(&key_id))
            .map(|k| k.fingerprint.clone())
            .ok_or(KeyringError::KeyNotFound { id: key_id })
    }

    /// Public key matching `key_id`, if this keyring holds one.
    ///
    /// A key only held as a private record yields that record's public part.
    pub async fn find_public_key(&self, key_id: &str) -> Option<Key> {
        let key_id = normalize_key_id(key_id).ok()?;
        let state = self.state.read().await;
        state
            .public
            .iter()
            .find(|k| k.matches_id(&key_id))
            .cloned()
            .or_else(|| {
                state
                    .private
                    .iter()
                    .find(|k| k.matches_id(&key_id))
                    .map(Key::to_public)
            })
    }

    /// Whether either key set holds `fingerprint`.
    pub async fn has_key(&self, fingerprint: &str) -> bool {
        let state = self.state.read().await;
        state.all_keys().any(|k| k.fingerprint == fingerprint)
    }

    /// Remove every persisted record of this keyring in one batch and
    /// refuse further mutations through this handle.
    pub(crate) async fn delete(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.state.read().await.ensure_live(&self.id)?;

        self.attribute_store
            .remove(
                &self.id,
                vec![
                    StorageOp::Remove {
                        key: public_keys_record(&self.id),
                    },
                    StorageOp::Remove {
                        key: private_keys_record(&self.id),
                    },
                ],
            )
            .await?;

        let mut state = self.state.write().await;
        *state = KeyStoreState {
            deleted: true,
            ..KeyStoreState::default()
        };
        Ok(())
    }

    async fn persist_keys(&self, public: &[Key], private: &[Key]) -> Result<()> {
        self.attribute_store
            .storage()
            .commit(vec![
                StorageOp::Set {
                    key: public_keys_record(&self.id),
                    value: serde_json::to_value(public)?,
                },
                StorageOp::Set {
                    key: private_keys_record(&self.id),
                    value: serde_json::to_value(private)?,
                },
            ])
            .await
    }
}

/// Decode a persisted key set, holding every record to the import checks.
fn read_keys(value: Option<Value>, private: bool) -> Result<Vec<Key>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let keys: Vec<Key> = serde_json::from_value(value)?;
    keys.into_iter()
        .map(|key| {
            checked_key(key, private).map_err(|err| KeyringError::Storage {
                detail: format!("Corrupt key record: {err}"),
            })
        })
        .collect()
}

/// Normalize a key's identifiers and check it belongs in the target set.
fn checked_key(mut key: Key, private: bool) -> Result<Key> {
    key.fingerprint = normalize_fingerprint(&key.fingerprint)?;
    key.subkey_fingerprints = key
        .subkey_fingerprints
        .iter()
        .map(|f| normalize_fingerprint(f))
        .collect::<Result<_>>()?;

    let invalid = |reason: &str| KeyringError::InvalidKey {
        fingerprint: key.fingerprint.clone(),
        reason: reason.to_string(),
    };

    match &key.material {
        KeyMaterial::Public { .. } if private => {
            return Err(invalid("no private material in a private key"));
        }
        KeyMaterial::Private { .. } if !private => {
            return Err(invalid("private material in the public key set"));
        }
        KeyMaterial::Private { locked, .. } if locked.is_empty() => {
            return Err(invalid("empty private material"));
        }
        _ => {}
    }
    if key.public_material().is_empty() {
        return Err(invalid("empty public material"));
    }

    Ok(key)
}

fn merge_key(set: &mut Vec<Key>, key: Key, summary: &mut ImportSummary) {
    if set.iter().any(|k| k.fingerprint == key.fingerprint) {
        summary.unchanged.push(key.fingerprint);
        return;
    }
    summary.added.push(key.fingerprint.clone());
    set.push(key);
}
