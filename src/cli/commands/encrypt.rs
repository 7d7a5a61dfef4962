use std::path::Path;

use ringkeeper::adapters::crypto::age_backend::AgeBackend;
use ringkeeper::core::errors::Result;
use ringkeeper::core::services::crypto_service::{CryptoService, EncryptRequest};

use crate::cli::context::Context;
use crate::cli::output;

/// Execute the `ringkeeper encrypt` command.
///
/// Encrypts input for every `--to` fingerprint of the keyring. A
/// fingerprint the keyring does not hold fails the whole command.
pub async fn execute(
    ctx: &Context,
    keyring: Option<&str>,
    recipients: &[String],
    sign: Option<&str>,
    input: Option<&Path>,
    output_path: Option<&Path>,
) -> Result<()> {
    let store = ctx.keyring(keyring).await?;
    let data = super::read_input(input)?;

    let service = CryptoService::new(AgeBackend::new());
    let ciphertext = service
        .encrypt(
            &store,
            EncryptRequest {
                data,
                encryption_key_fprs: recipients.to_vec(),
                signing_key_fpr: sign.map(str::to_string),
            },
            &ctx.unlocker(),
        )
        .await?;

    super::write_output(output_path, &ciphertext)?;
    if let Some(path) = output_path {
        output::success(&format!(
            "Encrypted for {} recipient(s) → {}",
            recipients.len(),
            path.display()
        ));
    }
    Ok(())
}
