use std::io::Read;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::core::errors::{KeyringError, Result};
use crate::core::models::key::{Key, KeyMaterial};
use crate::core::models::message::UnlockedKey;
use crate::core::traits::unlock::KeyUnlocker;

const SECRET_KEY_PREFIX: &str = "AGE-SECRET-KEY-";

/// Unlocks age identities, optionally wrapped in passphrase encryption.
///
/// Plain identities need no passphrase. Wrapped ones (`age -p -a` output)
/// are opened with the configured passphrase; without one the unlock is
/// cancelled rather than failed.
pub struct PassphraseUnlocker {
    passphrase: Option<SecretString>,
}

impl PassphraseUnlocker {
    pub fn new(passphrase: Option<SecretString>) -> Self {
        Self { passphrase }
    }

    /// Unlocker for plain identities only.
    pub fn without_passphrase() -> Self {
        Self { passphrase: None }
    }
}

#[async_trait]
impl KeyUnlocker for PassphraseUnlocker {
    async fn unlock(&self, key: &Key) -> Result<UnlockedKey> {
        let KeyMaterial::Private { locked, .. } = &key.material else {
            return Err(KeyringError::UnlockFailed {
                fingerprint: key.fingerprint.clone(),
                reason: "no private key material".into(),
            });
        };

        let identity = open_identity(locked, self.passphrase.as_ref(), &key.fingerprint)?;
        if identity.to_public().to_string() != key.public_material() {
            return Err(KeyringError::UnlockFailed {
                fingerprint: key.fingerprint.clone(),
                reason: "private material does not match the public key".into(),
            });
        }

        debug!(fingerprint = %key.fingerprint, "private key unlocked");
        Ok(UnlockedKey::new(key.clone(), identity.to_string()))
    }
}

/// Turn locked material into an age identity.
///
/// `fingerprint` only labels errors.
pub fn open_identity(
    locked: &str,
    passphrase: Option<&SecretString>,
    fingerprint: &str,
) -> Result<age::x25519::Identity> {
    let locked = locked.trim();
    if locked.starts_with(SECRET_KEY_PREFIX) {
        return parse_identity(locked, fingerprint);
    }

    let Some(passphrase) = passphrase else {
        return Err(KeyringError::UnlockCancelled {
            fingerprint: fingerprint.to_string(),
        });
    };

    let failed = |reason: String| KeyringError::UnlockFailed {
        fingerprint: fingerprint.to_string(),
        reason,
    };

    let decryptor = age::Decryptor::new(age::armor::ArmoredReader::new(locked.as_bytes()))
        .map_err(|e| failed(format!("unreadable locked key: {e}")))?;
    if !decryptor.is_scrypt() {
        return Err(failed("locked key is not passphrase-protected".into()));
    }

    let scrypt = age::scrypt::Identity::new(SecretString::from(
        passphrase.expose_secret().to_string(),
    ));
    let mut reader = decryptor
        .decrypt(std::iter::once(&scrypt as &dyn age::Identity))
        .map_err(|_| failed("wrong passphrase".into()))?;

    let mut plaintext = String::new();
    reader
        .read_to_string(&mut plaintext)
        .map_err(|e| failed(format!("read failed: {e}")))?;

    let line = plaintext
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(SECRET_KEY_PREFIX))
        .ok_or_else(|| failed("no identity inside locked key".into()))?;
    parse_identity(line, fingerprint)
}

fn parse_identity(text: &str, fingerprint: &str) -> Result<age::x25519::Identity> {
    text.parse::<age::x25519::Identity>()
        .map_err(|e: &str| KeyringError::UnlockFailed {
            fingerprint: fingerprint.to_string(),
            reason: format!("invalid identity: {e}"),
        })
}
