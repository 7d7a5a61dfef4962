use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::core::errors::{KeyringError, Result};
use crate::core::models::key::Key;
use crate::core::models::signature::{RawSignature, Signature};

/// Requested shape of decrypted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Utf8,
    Binary,
}

impl FromStr for OutputFormat {
    type Err = KeyringError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "utf8" => Ok(Self::Utf8),
            "binary" => Ok(Self::Binary),
            other => Err(KeyringError::InvalidConfig {
                detail: format!("Unknown output format '{other}'. Use 'utf8' or 'binary'."),
            }),
        }
    }
}

/// Decrypted message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Shape raw plaintext according to `format`.
    pub fn from_bytes(bytes: Vec<u8>, format: OutputFormat) -> Result<Self> {
        match format {
            OutputFormat::Binary => Ok(Self::Binary(bytes)),
            OutputFormat::Utf8 => String::from_utf8(bytes).map(Self::Text).map_err(|_| {
                KeyringError::DecryptionFailed {
                    reason: "Decrypted content is not valid UTF-8".into(),
                }
            }),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// What a `CryptoBackend` returns from decrypt-and-verify.
#[derive(Debug, Clone)]
pub struct Decrypted {
    pub data: Payload,
    pub signatures: Vec<RawSignature>,
}

/// Result of a successful decryption after signature post-processing.
#[derive(Debug, Clone)]
pub struct DecryptResult {
    pub data: Payload,
    pub signatures: Vec<Signature>,
}

/// Private key with usable secret material.
///
/// Exists only for the duration of one decrypt or encrypt call and is never
/// persisted.
pub struct UnlockedKey {
    key: Key,
    secret: SecretString,
}

impl UnlockedKey {
    pub fn new(key: Key, secret: SecretString) -> Self {
        Self { key, secret }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for UnlockedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedKey")
            .field("fingerprint", &self.key.fingerprint)
            .finish_non_exhaustive()
    }
}
