/// All domain errors for ringkeeper.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error(
        "Keyring '{id}' not found\n\n  \
         Run 'ringkeeper keyring list' to see available keyrings."
    )]
    KeyringNotFound { id: String },

    #[error("Keyring '{id}' already exists")]
    DuplicateKeyring { id: String },

    #[error("Key not found: {id}")]
    KeyNotFound { id: String },

    #[error(
        "Key IDs {ids} match more than one private key ({fingerprints})\n\n  \
         Pass a full fingerprint to pick one."
    )]
    AmbiguousKey { ids: String, fingerprints: String },

    #[error(
        "Decryption failed: no private key for {key_ids}\n\n  \
         The message was not encrypted for any key in this keyring.\n\n  \
         Solutions:\n    \
         → Check the keyring: ringkeeper keys list --keyring <id>\n    \
         → Ask the sender to encrypt for your public key"
    )]
    DecryptionKeyNotFound { key_ids: String },

    #[error("Could not unlock key {fingerprint}: {reason}")]
    UnlockFailed { fingerprint: String, reason: String },

    #[error("Unlocking key {fingerprint} was cancelled")]
    UnlockCancelled { fingerprint: String },

    /// Never surfaces from `decrypt`: the signature is demoted to invalid.
    #[error("Signer key ID {key_id} does not map to a known fingerprint")]
    SignatureFingerprintUnresolved { key_id: String },

    #[error("Invalid key ID '{id}': {reason}")]
    InvalidKeyId { id: String, reason: String },

    #[error("Invalid keyring name '{name}': {reason}")]
    InvalidKeyringName { name: String, reason: String },

    #[error("Invalid key {fingerprint}: {reason}")]
    InvalidKey { fingerprint: String, reason: String },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Storage error: {detail}")]
    Storage { detail: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KeyringError {
    fn from(err: serde_json::Error) -> Self {
        KeyringError::Storage {
            detail: format!("JSON error: {err}"),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeyringError>;
