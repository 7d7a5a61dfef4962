use crate::core::errors::{KeyringError, Result};
use crate::core::models::key::KEY_ID_LEN;

/// Validates a keyring id.
///
/// Accepted: non-empty, alphanumeric characters, hyphens and underscores.
/// Ids end up inside storage record names, so nothing else is allowed.
pub fn validate_keyring_id(id: &str) -> Result<&str> {
    if id.is_empty() {
        return Err(KeyringError::InvalidKeyringName {
            name: id.to_string(),
            reason: "keyring id cannot be empty".to_string(),
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(KeyringError::InvalidKeyringName {
            name: id.to_string(),
            reason: "keyring id must contain only alphanumeric characters, hyphens, or underscores"
                .to_string(),
        });
    }

    Ok(id)
}

/// Validates a key ID or fingerprint and normalizes it.
///
/// Accepted formats:
/// - 16 hex characters (long key ID)
/// - 40 hex characters (v4 fingerprint)
/// - 64 hex characters (v5/v6 fingerprint)
/// - Any of the above with "0x" prefix
///
/// Returns the lowercase id without prefix.
pub fn normalize_key_id(id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(KeyringError::InvalidKeyId {
            id: id.to_string(),
            reason: "key ID cannot be empty".to_string(),
        });
    }

    let normalized = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id)
        .to_lowercase();

    if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(KeyringError::InvalidKeyId {
            id: id.to_string(),
            reason: "key ID must contain only hexadecimal characters".to_string(),
        });
    }

    match normalized.len() {
        KEY_ID_LEN | 40 | 64 => Ok(normalized),
        len => Err(KeyringError::InvalidKeyId {
            id: id.to_string(),
            reason: format!("key ID must be 16, 40, or 64 hex characters (got {len})"),
        }),
    }
}

/// Validates a fingerprint (40 or 64 hex characters) and normalizes it.
pub fn normalize_fingerprint(fingerprint: &str) -> Result<String> {
    let normalized = normalize_key_id(fingerprint)?;
    if normalized.len() == KEY_ID_LEN {
        return Err(KeyringError::InvalidKeyId {
            id: fingerprint.to_string(),
            reason: "expected a full fingerprint, got a key ID".to_string(),
        });
    }
    Ok(normalized)
}

/// Normalize a batch of key IDs, failing on the first invalid one.
pub fn normalize_key_ids<S: AsRef<str>>(ids: &[S]) -> Result<Vec<String>> {
    ids.iter().map(|id| normalize_key_id(id.as_ref())).collect()
}
