use async_trait::async_trait;

use crate::core::errors::Result;
use crate::core::models::key::Key;
use crate::core::models::message::{Decrypted, OutputFormat, UnlockedKey};

/// Port for the cryptographic primitives library.
///
/// Implementations live in `adapters::crypto` (e.g. AgeBackend).
/// The core layer only depends on this trait, never on a concrete backend.
#[async_trait]
pub trait CryptoBackend: Send + Sync {
    /// Decrypt `message` with `private_key` and check its signatures against
    /// `signers`. An empty `signers` slice means verification is skipped.
    async fn decrypt_and_verify(
        &self,
        message: &[u8],
        private_key: &UnlockedKey,
        signers: &[Key],
        format: OutputFormat,
    ) -> Result<Decrypted>;

    /// Encrypt `data` for `recipients`, signing with `signer` when given.
    async fn encrypt_and_sign(
        &self,
        data: &[u8],
        recipients: &[Key],
        signer: Option<&UnlockedKey>,
    ) -> Result<Vec<u8>>;

    /// Human-readable name of this backend (e.g. "age").
    fn name(&self) -> &str;
}
