use serde::Serialize;

/// Outcome of checking one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureValidity {
    Valid,
    Invalid,
    /// No candidate signer key matched, so nothing was checked.
    Unresolved,
}

impl SignatureValidity {
    /// Map the primitives library's tri-state verdict.
    pub fn from_verdict(valid: Option<bool>) -> Self {
        match valid {
            Some(true) => Self::Valid,
            Some(false) => Self::Invalid,
            None => Self::Unresolved,
        }
    }
}

/// Signature record as reported by a `CryptoBackend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    /// Wire-format issuer key ID.
    pub signer_id: [u8; 8],
    /// `None` when no candidate key matched the signer.
    pub valid: Option<bool>,
}

/// Signature after key ID and fingerprint resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    /// Lowercase hex key ID of the signer.
    pub key_id: String,
    /// Present only when the signer resolved to a key in the keyring.
    pub fingerprint: Option<String>,
    pub validity: SignatureValidity,
}

impl Signature {
    pub fn is_valid(&self) -> bool {
        self.validity == SignatureValidity::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_maps_to_validity() {
        assert_eq!(
            SignatureValidity::from_verdict(Some(true)),
            SignatureValidity::Valid
        );
        assert_eq!(
            SignatureValidity::from_verdict(Some(false)),
            SignatureValidity::Invalid
        );
        assert_eq!(
            SignatureValidity::from_verdict(None),
            SignatureValidity::Unresolved
        );
    }
}
