use ringkeeper::core::errors::Result;

use crate::cli::context::Context;
use crate::cli::output;

/// Execute the `ringkeeper sync` command.
pub async fn execute(ctx: &Context, keyring: &str, key_ids: &[String]) -> Result<()> {
    let report = ctx.registry.sync_public_keys(keyring, key_ids).await?;

    for fpr in &report.copied {
        output::success(&format!("Copied {fpr} into '{keyring}'"));
    }
    for fpr in &report.already_present {
        output::success(&format!("{fpr} already in '{keyring}'"));
    }
    for key_id in &report.not_found {
        output::warning(&format!("No keyring holds key {key_id}"));
    }
    Ok(())
}
