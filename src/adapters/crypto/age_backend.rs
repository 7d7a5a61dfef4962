use std::io::{Read, Write};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::adapters::unlock::passphrase_unlocker::open_identity;
use crate::core::errors::{KeyringError, Result};
use crate::core::models::key::{Key, KeyMaterial};
use crate::core::models::message::{Decrypted, OutputFormat, Payload, UnlockedKey};
use crate::core::traits::crypto::CryptoBackend;

/// Hex digits of the recipient digest used as an age key fingerprint.
const FINGERPRINT_LEN: usize = 40;

/// Age encryption backend using X25519 + ChaCha20-Poly1305.
///
/// Public key material is the `age1…` recipient string, private key
/// material an `AGE-SECRET-KEY-…` identity (optionally passphrase-wrapped).
/// Output is ASCII-armored. Age has no signatures: decryption never reports
/// any and a signing request is refused.
#[derive(Debug, Default)]
pub struct AgeBackend;

impl AgeBackend {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint of an age recipient: leading hex digits of its SHA-256.
    pub fn fingerprint(recipient: &str) -> String {
        let digest = hex::encode(Sha256::digest(recipient.trim().as_bytes()));
        digest[..FINGERPRINT_LEN].to_string()
    }

    /// Build a public key record from a recipient string.
    pub fn public_key(recipient: &str, user_ids: Vec<String>) -> Result<Key> {
        let recipient = Self::parse_recipient(recipient)?.to_string();
        Ok(Key {
            fingerprint: Self::fingerprint(&recipient),
            subkey_fingerprints: Vec::new(),
            user_ids,
            material: KeyMaterial::Public { public: recipient },
            created_at: Some(chrono::Utc::now()),
        })
    }

    /// Build a private key record from identity file content.
    ///
    /// `content` is either a plain identity (as in age's `keys.txt`) or an
    /// armored, passphrase-encrypted one. The passphrase is only needed to
    /// derive the recipient and is not kept; the stored material stays
    /// exactly as given.
    pub fn private_key(
        content: &str,
        user_ids: Vec<String>,
        passphrase: Option<&secrecy::SecretString>,
    ) -> Result<Key> {
        let locked = locked_material(content);
        let identity = open_identity(&locked, passphrase, "(import)")?;
        let recipient = identity.to_public().to_string();
        Ok(Key {
            fingerprint: Self::fingerprint(&recipient),
            subkey_fingerprints: Vec::new(),
            user_ids,
            material: KeyMaterial::Private {
                public: recipient,
                locked,
            },
            created_at: Some(chrono::Utc::now()),
        })
    }

    fn parse_recipient(recipient: &str) -> Result<age::x25519::Recipient> {
        recipient
            .trim()
            .parse::<age::x25519::Recipient>()
            .map_err(|e: &str| KeyringError::InvalidKey {
                fingerprint: recipient.to_string(),
                reason: format!("Invalid age recipient: {e}"),
            })
    }

    fn recipients(keys: &[Key]) -> Result<Vec<age::x25519::Recipient>> {
        keys.iter()
            .map(|key| {
                key.public_material()
                    .parse::<age::x25519::Recipient>()
                    .map_err(|e: &str| KeyringError::EncryptionFailed {
                        reason: format!("Invalid recipient key {}: {e}", key.fingerprint),
                    })
            })
            .collect()
    }

    fn identity(key: &UnlockedKey) -> Result<age::x25519::Identity> {
        key.expose_secret()
            .trim()
            .parse::<age::x25519::Identity>()
            .map_err(|e: &str| KeyringError::DecryptionFailed {
                reason: format!("Unusable identity for {}: {e}", key.key().fingerprint),
            })
    }
}

/// Keep only the identity line of a plain `keys.txt`; armored content is
/// stored whole.
fn locked_material(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("AGE-SECRET-KEY-"))
        .map(str::to_string)
        .unwrap_or_else(|| content.trim().to_string())
}

#[async_trait]
impl CryptoBackend for AgeBackend {
    async fn decrypt_and_verify(
        &self,
        message: &[u8],
        private_key: &UnlockedKey,
        signers: &[Key],
        format: OutputFormat,
    ) -> Result<Decrypted> {
        let identity = Self::identity(private_key)?;
        if !signers.is_empty() {
            debug!(
                candidates = signers.len(),
                "age messages carry no signatures, nothing to verify"
            );
        }

        let armored_reader = age::armor::ArmoredReader::new(message);
        let decryptor =
            age::Decryptor::new(armored_reader).map_err(|e| KeyringError::DecryptionFailed {
                reason: format!("Invalid encrypted message: {e}"),
            })?;

        let mut reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(|e| KeyringError::DecryptionFailed {
                reason: format!(
                    "Cannot decrypt with key {}: {e}",
                    private_key.key().fingerprint
                ),
            })?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| KeyringError::DecryptionFailed {
                reason: format!("Read decrypted data failed: {e}"),
            })?;

        Ok(Decrypted {
            data: Payload::from_bytes(plaintext, format)?,
            signatures: Vec::new(),
        })
    }

    async fn encrypt_and_sign(
        &self,
        data: &[u8],
        recipients: &[Key],
        signer: Option<&UnlockedKey>,
    ) -> Result<Vec<u8>> {
        if let Some(signer) = signer {
            return Err(KeyringError::EncryptionFailed {
                reason: format!(
                    "age cannot sign messages (signing key {})",
                    signer.key().fingerprint
                ),
            });
        }
        if recipients.is_empty() {
            return Err(KeyringError::EncryptionFailed {
                reason: "No recipients provided".into(),
            });
        }

        let parsed = Self::recipients(recipients)?;
        let encryptor =
            age::Encryptor::with_recipients(parsed.iter().map(|r| r as &dyn age::Recipient))
                .map_err(|e| KeyringError::EncryptionFailed {
                    reason: format!("{e}"),
                })?;

        let mut output = Vec::new();
        let armored =
            age::armor::ArmoredWriter::wrap_output(&mut output, age::armor::Format::AsciiArmor)
                .map_err(|e| KeyringError::EncryptionFailed {
                    reason: format!("Armor writer failed: {e}"),
                })?;

        let mut writer =
            encryptor
                .wrap_output(armored)
                .map_err(|e| KeyringError::EncryptionFailed {
                    reason: format!("Encryption stream failed: {e}"),
                })?;

        writer
            .write_all(data)
            .map_err(|e| KeyringError::EncryptionFailed {
                reason: format!("Write failed: {e}"),
            })?;

        writer
            .finish()
            .and_then(|armored| armored.finish())
            .map_err(|e| KeyringError::EncryptionFailed {
                reason: format!("Encryption finish failed: {e}"),
            })?;

        Ok(output)
    }

    fn name(&self) -> &str {
        "age"
    }
}
