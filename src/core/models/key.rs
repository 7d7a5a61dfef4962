use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of trailing fingerprint hex digits that form a key ID.
pub const KEY_ID_LEN: usize = 16;

static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>.*?)\s*<(?P<email>[^<>\s]+@[^<>\s]+)>\s*$")
        .expect("user ID pattern is valid")
});

/// Key material for one identity.
///
/// Public and private records for the same fingerprint are stored side by
/// side in a keyring, never merged. A private record carries its public part
/// so it can resolve key IDs and serve as a verification key on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyMaterial {
    Public { public: String },
    /// `locked` is opaque until a `KeyUnlocker` turns it into usable material.
    Private { public: String, locked: String },
}

/// A cryptographic identity as stored in a keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Lowercase hex fingerprint of the primary key.
    pub fingerprint: String,
    #[serde(default)]
    pub subkey_fingerprints: Vec<String>,
    /// Raw user IDs, typically `Name <address>`.
    #[serde(default)]
    pub user_ids: Vec<String>,
    pub material: KeyMaterial,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Key {
    pub fn has_private_material(&self) -> bool {
        matches!(self.material, KeyMaterial::Private { .. })
    }

    pub fn public_material(&self) -> &str {
        match &self.material {
            KeyMaterial::Public { public } | KeyMaterial::Private { public, .. } => public,
        }
    }

    /// Public-only copy of this key, used when key material is shared.
    pub fn to_public(&self) -> Key {
        Key {
            material: KeyMaterial::Public {
                public: self.public_material().to_string(),
            },
            ..self.clone()
        }
    }

    /// Key ID of the primary key.
    pub fn key_id(&self) -> &str {
        key_id_of(&self.fingerprint)
    }

    /// Key IDs of the primary key followed by every subkey.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.fingerprint.as_str())
            .chain(self.subkey_fingerprints.iter().map(String::as_str))
            .map(key_id_of)
    }

    /// Whether `id` (a normalized key ID or fingerprint) names this key
    /// or one of its subkeys.
    pub fn matches_id(&self, id: &str) -> bool {
        if id.len() > KEY_ID_LEN {
            return self.fingerprint == id || self.subkey_fingerprints.iter().any(|f| f == id);
        }
        self.key_ids().any(|kid| kid == id)
    }

    /// Parsed user identities bound to this key.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.user_ids.iter().map(|uid| UserId::parse(uid))
    }

    /// Whether any user ID is bound to `address` (already lowercased).
    pub fn has_address(&self, address: &str) -> bool {
        self.users().any(|u| u.email == address)
    }
}

/// Key ID for a fingerprint: its last 16 hex digits.
///
/// Counts characters, so a malformed fingerprint never splits a code point.
pub fn key_id_of(fingerprint: &str) -> &str {
    let start = fingerprint
        .char_indices()
        .rev()
        .nth(KEY_ID_LEN - 1)
        .map_or(0, |(idx, _)| idx);
    &fingerprint[start..]
}

/// A user identity split into display name and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId {
    pub raw: String,
    pub name: String,
    pub email: String,
}

impl UserId {
    /// Parse `Name <address>` or a bare address. The address is lowercased;
    /// anything unparseable becomes a name with an empty address.
    pub fn parse(raw: &str) -> Self {
        if let Some(caps) = USER_ID_RE.captures(raw) {
            return Self {
                raw: raw.to_string(),
                name: caps["name"].trim_matches('"').to_string(),
                email: caps["email"].to_lowercase(),
            };
        }

        let trimmed = raw.trim();
        if trimmed.contains('@') && !trimmed.contains(char::is_whitespace) {
            return Self {
                raw: raw.to_string(),
                name: String::new(),
                email: trimmed.to_lowercase(),
            };
        }

        Self {
            raw: raw.to_string(),
            name: trimmed.to_string(),
            email: String::new(),
        }
    }
}

/// Key material to merge into a keyring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundle {
    #[serde(default)]
    pub public: Vec<Key>,
    #[serde(default)]
    pub private: Vec<Key>,
}

/// Listing projection: one record per user identity bound to a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyData {
    pub user_id: String,
    pub key_id: String,
    pub fingerprint: String,
    pub email: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fingerprint: &str, subkeys: &[&str]) -> Key {
        Key {
            fingerprint: fingerprint.into(),
            subkey_fingerprints: subkeys.iter().map(|s| s.to_string()).collect(),
            user_ids: vec!["Max Mustermann <Max@Mailvelope.com>".into()],
            material: KeyMaterial::Public {
                public: "pub".into(),
            },
            created_at: None,
        }
    }

    #[test]
    fn key_id_is_fingerprint_suffix() {
        assert_eq!(
            key_id_of("81364a0ac8ed2b6b1c6e4de9a9b65c80d7b21a26"),
            "a9b65c80d7b21a26"
        );
        assert_eq!(key_id_of("abcd"), "abcd");
    }

    #[test]
    fn key_id_of_non_ascii_input_does_not_panic() {
        assert_eq!(key_id_of("ééééééééééééééééé"), "éééééééééééééééé");
        assert_eq!(key_id_of("81364a0ac8ed2b6b1c6e4de9a9b65c80d7b2ééé").chars().count(), 16);
    }

    #[test]
    fn matches_subkey_ids_and_fingerprints() {
        let k = key(
            "81364a0ac8ed2b6b1c6e4de9a9b65c80d7b21a26",
            &["0000000000000000000000001111222233334444"],
        );
        assert!(k.matches_id("a9b65c80d7b21a26"));
        assert!(k.matches_id("1111222233334444"));
        assert!(k.matches_id("0000000000000000000000001111222233334444"));
        assert!(!k.matches_id("ffffffffffffffff"));
        assert_eq!(k.key_ids().count(), 2);
    }

    #[test]
    fn private_record_exposes_public_part() {
        let mut k = key("81364a0ac8ed2b6b1c6e4de9a9b65c80d7b21a26", &[]);
        k.material = KeyMaterial::Private {
            public: "pub".into(),
            locked: "secret".into(),
        };
        assert!(k.has_private_material());
        assert_eq!(k.public_material(), "pub");

        let public = k.to_public();
        assert!(!public.has_private_material());
        assert_eq!(public.fingerprint, k.fingerprint);
    }

    #[test]
    fn parse_user_id_with_name() {
        let uid = UserId::parse("Madita Bernstone <Madita@Mailvelope.com>");
        assert_eq!(uid.name, "Madita Bernstone");
        assert_eq!(uid.email, "madita@mailvelope.com");
    }

    #[test]
    fn parse_bare_address_and_plain_name() {
        let bare = UserId::parse("j.doe@gmail.com");
        assert_eq!(bare.name, "");
        assert_eq!(bare.email, "j.doe@gmail.com");

        let name_only = UserId::parse("Release Signing Key");
        assert_eq!(name_only.name, "Release Signing Key");
        assert!(name_only.email.is_empty());
    }

    #[test]
    fn address_match_is_case_insensitive_via_parse() {
        let k = key("81364a0ac8ed2b6b1c6e4de9a9b65c80d7b21a26", &[]);
        assert!(k.has_address("max@mailvelope.com"));
        assert!(!k.has_address("other@mailvelope.com"));
    }
}
