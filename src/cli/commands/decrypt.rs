use std::path::Path;

use ringkeeper::adapters::crypto::age_backend::AgeBackend;
use ringkeeper::core::errors::{KeyringError, Result};
use ringkeeper::core::models::message::OutputFormat;
use ringkeeper::core::services::crypto_service::{CryptoService, DecryptRequest};

use crate::cli::context::Context;
use crate::cli::output;

/// Arguments of `ringkeeper decrypt`.
pub struct DecryptArgs<'a> {
    pub keyring: Option<&'a str>,
    pub key_ids: &'a [String],
    pub senders: &'a [String],
    pub self_signed: bool,
    pub binary: bool,
    pub input: Option<&'a Path>,
    pub output: Option<&'a Path>,
}

/// Execute the `ringkeeper decrypt` command.
///
/// Decrypted data goes to stdout (or `--output`); signature results go to
/// stderr.
pub async fn execute(ctx: &Context, args: DecryptArgs<'_>) -> Result<()> {
    let store = ctx.keyring(args.keyring).await?;

    let encryption_key_ids = if args.key_ids.is_empty() {
        let default_key = store
            .default_key_fpr()
            .await
            .ok_or_else(|| KeyringError::InvalidConfig {
                detail: format!(
                    "Keyring '{}' has no default key. Pass --key <id>.",
                    store.id()
                ),
            })?;
        vec![default_key]
    } else {
        args.key_ids.to_vec()
    };

    let format = if args.binary {
        OutputFormat::Binary
    } else {
        OutputFormat::Utf8
    };

    let service = CryptoService::new(AgeBackend::new());
    let result = service
        .decrypt(
            &store,
            DecryptRequest {
                message: super::read_input(args.input)?,
                sender_addresses: args.senders.to_vec(),
                self_signed: args.self_signed,
                encryption_key_ids,
                format,
            },
            &ctx.unlocker(),
        )
        .await?;

    super::write_output(args.output, result.data.as_bytes())?;
    if let Some(path) = args.output {
        output::success(&format!("Decrypted → {}", path.display()));
    }
    for signature in &result.signatures {
        output::signature(signature);
    }
    if result.signatures.is_empty() && (!args.senders.is_empty() || args.self_signed) {
        output::warning("Message carries no signatures");
    }
    Ok(())
}
