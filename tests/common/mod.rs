#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use ringkeeper::adapters::storage::memory_storage::MemoryStorage;
use ringkeeper::core::errors::{KeyringError, Result};
use ringkeeper::core::models::key::{Key, KeyMaterial, key_id_of};
use ringkeeper::core::models::message::{Decrypted, OutputFormat, Payload, UnlockedKey};
use ringkeeper::core::models::signature::RawSignature;
use ringkeeper::core::services::keyring_registry::{KeyringRegistry, RegistryConfig};
use ringkeeper::core::traits::crypto::CryptoBackend;
use ringkeeper::core::traits::storage::{Storage, StorageOp};

pub const MAX_FPR: &str = "81364a0ac8ed2b6b1c6e4de9a9b65c80d7b21a26";
pub const MADITA_FPR: &str = "771f9119b823e06c0de306d466663688a83e9763";
pub const MADITA_SUB: &str = "5d1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c";
pub const GORDON_FPR: &str = "5a3b1c2d3e4f50617283940a1b2c3d4e5f607182";
pub const JOHN_FPR: &str = "e2f1c0a9b8d7e6f5a4b3c2d10c02c51f4af1a165";

pub fn public_key(fpr: &str, uids: &[&str]) -> Key {
    Key {
        fingerprint: fpr.to_string(),
        subkey_fingerprints: vec![],
        user_ids: uids.iter().map(|u| u.to_string()).collect(),
        material: KeyMaterial::Public {
            public: format!("pub-{fpr}"),
        },
        created_at: None,
    }
}

pub fn private_key(fpr: &str, uids: &[&str]) -> Key {
    Key {
        material: KeyMaterial::Private {
            public: format!("pub-{fpr}"),
            locked: format!("sec-{fpr}"),
        },
        ..public_key(fpr, uids)
    }
}

pub fn max_pub() -> Key {
    public_key(MAX_FPR, &["Max Mustermann <max@mailvelope.com>"])
}

pub fn madita_prv() -> Key {
    Key {
        subkey_fingerprints: vec![MADITA_SUB.to_string()],
        ..private_key(
            MADITA_FPR,
            &[
                "Madita Bernstone <madita@mailvelope.com>",
                "Madita Bernstone <madita.bernstone@gmail.com>",
                "Madita B. <mb@example.org>",
                "Madita <madita@posteo.de>",
            ],
        )
    }
}

pub fn gordon_pub() -> Key {
    public_key(GORDON_FPR, &["Gordon Freeman <gordon.freeman@gmail.com>"])
}

pub fn john_prv() -> Key {
    private_key(JOHN_FPR, &["John Doe <j.doe@gmail.com>"])
}

/// Storage seeded with keyrings `main` (Max public, Madita private, Madita
/// as default key) and `test123` (Gordon public, John private).
pub async fn seeded_storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .commit(vec![
            StorageOp::Set {
                key: "keyring.attributes".into(),
                value: json!({
                    "main": { "default_key": MADITA_FPR },
                    "test123": {}
                }),
            },
            StorageOp::Set {
                key: "keyring.main.public_keys".into(),
                value: serde_json::to_value(vec![max_pub()]).unwrap(),
            },
            StorageOp::Set {
                key: "keyring.main.private_keys".into(),
                value: serde_json::to_value(vec![madita_prv()]).unwrap(),
            },
            StorageOp::Set {
                key: "keyring.test123.public_keys".into(),
                value: serde_json::to_value(vec![gordon_pub()]).unwrap(),
            },
            StorageOp::Set {
                key: "keyring.test123.private_keys".into(),
                value: serde_json::to_value(vec![john_prv()]).unwrap(),
            },
        ])
        .await
        .unwrap();
    storage
}

/// Initialized registry over `seeded_storage`.
pub async fn fixture_registry() -> (Arc<MemoryStorage>, KeyringRegistry) {
    let storage = seeded_storage().await;
    let registry = KeyringRegistry::new(storage.clone(), RegistryConfig::default());
    registry.init().await.unwrap();
    (storage, registry)
}

/// Storage whose commits can be switched to fail, for rollback checks.
pub struct FlakyStorage {
    pub inner: Arc<MemoryStorage>,
    fail_commits: AtomicBool,
}

impl FlakyStorage {
    pub fn new(inner: Arc<MemoryStorage>) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(false),
        }
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn commit(&self, ops: Vec<StorageOp>) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(KeyringError::Storage {
                detail: "disk full".to_string(),
            });
        }
        self.inner.commit(ops).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Unlocked form of a fixture private key.
pub fn unlocked(key: &Key) -> UnlockedKey {
    UnlockedKey::new(key.clone(), SecretString::from(format!("sec-{}", key.fingerprint)))
}

/// Message format of `FakeBackend`: plain JSON, hex payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub recipients: Vec<String>,
    /// Fingerprint (primary or subkey) of the signing key.
    pub signer: Option<String>,
    pub data: String,
}

/// Build a message as if `signer` had signed it.
pub fn seal(data: &[u8], recipients: &[&str], signer: Option<&str>) -> Vec<u8> {
    serde_json::to_vec(&Envelope {
        recipients: recipients.iter().map(|r| r.to_string()).collect(),
        signer: signer.map(str::to_string),
        data: hex::encode(data),
    })
    .unwrap()
}

/// Deterministic stand-in for a primitives library.
///
/// A signer found among the candidate keys verifies as valid. A signer with
/// no candidate yields `None`, unless `trust_unknown_signers` is set, in
/// which case it claims the signature valid.
#[derive(Default)]
pub struct FakeBackend {
    pub trust_unknown_signers: bool,
    /// Fingerprints of the candidate signer set of every decrypt call.
    pub seen_signers: Mutex<Vec<Vec<String>>>,
}

impl FakeBackend {
    pub fn trusting() -> Self {
        Self {
            trust_unknown_signers: true,
            ..Self::default()
        }
    }

    pub fn last_signers(&self) -> Vec<String> {
        self.seen_signers
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CryptoBackend for FakeBackend {
    async fn decrypt_and_verify(
        &self,
        message: &[u8],
        private_key: &UnlockedKey,
        signers: &[Key],
        format: OutputFormat,
    ) -> Result<Decrypted> {
        self.seen_signers
            .lock()
            .unwrap()
            .push(signers.iter().map(|k| k.fingerprint.clone()).collect());

        let envelope: Envelope =
            serde_json::from_slice(message).map_err(|e| KeyringError::DecryptionFailed {
                reason: e.to_string(),
            })?;
        let fpr = &private_key.key().fingerprint;
        if !envelope.recipients.contains(fpr)
            || private_key.expose_secret() != format!("sec-{fpr}")
        {
            return Err(KeyringError::DecryptionFailed {
                reason: "not encrypted to this key".into(),
            });
        }

        let data = hex::decode(&envelope.data).map_err(|e| KeyringError::DecryptionFailed {
            reason: e.to_string(),
        })?;

        let signatures = match envelope.signer {
            None => vec![],
            Some(signer) => {
                let key_id = key_id_of(&signer);
                let mut signer_id = [0u8; 8];
                hex::decode_to_slice(key_id, &mut signer_id).unwrap();
                let matched = signers.iter().any(|k| k.matches_id(key_id));
                let valid = (matched || self.trust_unknown_signers).then_some(true);
                vec![RawSignature { signer_id, valid }]
            }
        };

        Ok(Decrypted {
            data: Payload::from_bytes(data, format)?,
            signatures,
        })
    }

    async fn encrypt_and_sign(
        &self,
        data: &[u8],
        recipients: &[Key],
        signer: Option<&UnlockedKey>,
    ) -> Result<Vec<u8>> {
        let recipients: Vec<&str> = recipients.iter().map(|k| k.fingerprint.as_str()).collect();
        Ok(seal(
            data,
            &recipients,
            signer.map(|s| s.key().fingerprint.as_str()),
        ))
    }

    fn name(&self) -> &str {
        "fake"
    }
}
