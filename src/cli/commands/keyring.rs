use ringkeeper::core::errors::Result;
use ringkeeper::core::models::attributes::DEFAULT_KEY_ATTR;

use crate::cli::KeyringAction;
use crate::cli::context::Context;
use crate::cli::output;

/// Execute the `ringkeeper keyring` command.
pub async fn execute(ctx: &Context, action: &KeyringAction) -> Result<()> {
    match action {
        KeyringAction::List => execute_list(ctx).await,
        KeyringAction::Create { id } => {
            ctx.registry.create_keyring(id).await?;
            output::success(&format!("Created keyring '{id}'"));
            Ok(())
        }
        KeyringAction::Delete { id } => {
            ctx.registry.delete_keyring(id).await?;
            output::success(&format!("Deleted keyring '{id}'"));
            Ok(())
        }
    }
}

async fn execute_list(ctx: &Context) -> Result<()> {
    let preferred = ctx.registry.get_preferred_keyring().await?;
    output::header(&format!(
        "Keyrings in {} (preferred: {})",
        ctx.data_dir.display(),
        ctx.config.ringkeeper.preferred
    ));

    for store in ctx.registry.get_all().await {
        let keys = store.get_all_keys().await;
        let private = keys.iter().filter(|k| k.has_private_material()).count();
        let marker = if store.id() == preferred.id() { "*" } else { " " };
        let default_key = store
            .get_attribute(DEFAULT_KEY_ATTR)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .map(|fpr| format!("  default {fpr}"))
            .unwrap_or_default();
        println!(
            "  {marker} {}  {} public, {private} private{default_key}",
            store.id(),
            keys.len() - private
        );
    }
    Ok(())
}
