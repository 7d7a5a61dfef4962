/// Per-keyring attribute map. Insertion order is preserved.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// Attribute holding the fingerprint of the keyring's default key.
pub const DEFAULT_KEY_ATTR: &str = "default_key";
