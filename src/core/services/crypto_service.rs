use tracing::{debug, warn};

use crate::core::errors::{KeyringError, Result};
use crate::core::models::key::Key;
use crate::core::models::message::{DecryptResult, OutputFormat};
use crate::core::models::signature::{RawSignature, Signature, SignatureValidity};
use crate::core::services::key_store::KeyStore;
use crate::core::traits::crypto::CryptoBackend;
use crate::core::traits::unlock::KeyUnlocker;

/// Inputs of a decrypt-and-verify call.
#[derive(Debug, Clone, Default)]
pub struct DecryptRequest {
    pub message: Vec<u8>,
    /// Addresses whose keys may have signed the message. May be empty.
    pub sender_addresses: Vec<String>,
    /// The message is signed with the decryption key itself (draft).
    pub self_signed: bool,
    /// Key IDs the message was encrypted for.
    pub encryption_key_ids: Vec<String>,
    pub format: OutputFormat,
}

/// Inputs of an encrypt-and-sign call.
#[derive(Debug, Clone, Default)]
pub struct EncryptRequest {
    pub data: Vec<u8>,
    pub encryption_key_fprs: Vec<String>,
    /// Sign with this private key; unsigned when `None`.
    pub signing_key_fpr: Option<String>,
}

/// Orchestrates decrypt/verify and encrypt/sign by combining a
/// `CryptoBackend` with the keys of one keyring.
pub struct CryptoService<C: CryptoBackend> {
    pub backend: C,
}

impl<C: CryptoBackend> CryptoService<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }

    /// Decrypt a message and verify its signatures.
    ///
    /// Either the whole payload comes back or the call fails; signatures
    /// that cannot be tied to a known fingerprint come back invalid.
    pub async fn decrypt(
        &self,
        keyring: &KeyStore,
        request: DecryptRequest,
        unlocker: &dyn KeyUnlocker,
    ) -> Result<DecryptResult> {
        let locked = keyring
            .get_private_key_by_ids(&request.encryption_key_ids)
            .await
            .map_err(|err| match err {
                KeyringError::KeyNotFound { .. } => KeyringError::DecryptionKeyNotFound {
                    key_ids: request.encryption_key_ids.join(", "),
                },
                other => other,
            })?;
        let private_key = unlocker.unlock(&locked).await?;

        let senders = normalize_addresses(&request.sender_addresses);
        let signers = if senders.is_empty() && !request.self_signed {
            Vec::new()
        } else {
            let mut by_address = keyring.get_key_by_address(&senders).await;
            let mut signers: Vec<Key> = Vec::new();
            for key in senders
                .iter()
                .flat_map(|address| by_address.remove(address).unwrap_or_default())
            {
                if !signers.iter().any(|k| k.fingerprint == key.fingerprint) {
                    signers.push(key);
                }
            }
            if signers.is_empty() {
                debug!(
                    fingerprint = %private_key.key().fingerprint,
                    "no sender keys, verifying against the decryption key"
                );
                signers.push(private_key.key().clone());
            }
            signers
        };

        let decrypted = self
            .backend
            .decrypt_and_verify(&request.message, &private_key, &signers, request.format)
            .await?;

        let mut signatures = Vec::with_capacity(decrypted.signatures.len());
        for raw in decrypted.signatures {
            signatures.push(resolve_signature(keyring, raw).await);
        }

        Ok(DecryptResult {
            data: decrypted.data,
            signatures,
        })
    }

    /// Encrypt for every requested recipient, optionally signing.
    ///
    /// A recipient fingerprint missing from the keyring fails the call;
    /// nothing is encrypted for a partial recipient list.
    pub async fn encrypt(
        &self,
        keyring: &KeyStore,
        request: EncryptRequest,
        unlocker: &dyn KeyUnlocker,
    ) -> Result<Vec<u8>> {
        let signer = match &request.signing_key_fpr {
            Some(fpr) => {
                let locked = keyring.get_private_key_by_ids(&[fpr]).await?;
                Some(unlocker.unlock(&locked).await?)
            }
            None => None,
        };

        let recipients = keyring
            .get_keys_by_fprs(&request.encryption_key_fprs)
            .await?;

        debug!(
            backend = self.backend.name(),
            recipients = recipients.len(),
            signed = signer.is_some(),
            "encrypting"
        );
        self.backend
            .encrypt_and_sign(&request.data, &recipients, signer.as_ref())
            .await
    }
}

/// Attach the signer's key ID and fingerprint to a backend verdict.
///
/// A verdict whose signer does not resolve to a fingerprint is demoted to
/// invalid. Unresolved verdicts pass through without a fingerprint.
async fn resolve_signature(keyring: &KeyStore, raw: RawSignature) -> Signature {
    let key_id = hex::encode(raw.signer_id);
    let validity = SignatureValidity::from_verdict(raw.valid);
    if validity == SignatureValidity::Unresolved {
        return Signature {
            key_id,
            fingerprint: None,
            validity,
        };
    }

    match signer_fingerprint(keyring, &key_id).await {
        Ok(fingerprint) => Signature {
            key_id,
            fingerprint: Some(fingerprint),
            validity,
        },
        Err(err) => {
            warn!(%key_id, error = %err, "rejecting signature");
            Signature {
                key_id,
                fingerprint: None,
                validity: SignatureValidity::Invalid,
            }
        }
    }
}

async fn signer_fingerprint(keyring: &KeyStore, key_id: &str) -> Result<String> {
    keyring.get_fpr_for_key_id(key_id).await.map_err(|_| {
        KeyringError::SignatureFingerprintUnresolved {
            key_id: key_id.to_string(),
        }
    })
}

/// Trimmed, lowercased, de-duplicated sender addresses.
fn normalize_addresses(addresses: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for address in addresses {
        let address = address.trim().to_lowercase();
        if !address.is_empty() && !normalized.contains(&address) {
            normalized.push(address);
        }
    }
    normalized
}
