use serde_json::Value;

use ringkeeper::adapters::crypto::age_backend::AgeBackend;
use ringkeeper::core::errors::{KeyringError, Result};
use ringkeeper::core::models::attributes::DEFAULT_KEY_ATTR;
use ringkeeper::core::models::key::KeyBundle;

use crate::cli::KeysAction;
use crate::cli::context::Context;
use crate::cli::output;

/// Execute the `ringkeeper keys` command.
pub async fn execute(ctx: &Context, action: &KeysAction) -> Result<()> {
    match action {
        KeysAction::List { keyring } => execute_list(ctx, keyring.as_deref()).await,
        KeysAction::Import {
            keyring,
            recipient,
            identity,
            user_ids,
            default,
        } => {
            let bundle = match (recipient, identity) {
                (Some(recipient), _) => KeyBundle {
                    public: vec![AgeBackend::public_key(recipient, user_ids.clone())?],
                    private: vec![],
                },
                (None, Some(path)) => {
                    let content = std::fs::read_to_string(path)?;
                    let passphrase = ctx.passphrase();
                    KeyBundle {
                        public: vec![],
                        private: vec![AgeBackend::private_key(
                            &content,
                            user_ids.clone(),
                            passphrase.as_ref(),
                        )?],
                    }
                }
                (None, None) => {
                    return Err(KeyringError::InvalidConfig {
                        detail: "Nothing to import. Use --recipient or --identity.".into(),
                    });
                }
            };
            execute_import(ctx, keyring.as_deref(), bundle, *default).await
        }
        KeysAction::Remove {
            keyring,
            fingerprint,
        } => {
            let store = ctx.keyring(keyring.as_deref()).await?;
            store.remove_key(fingerprint).await?;
            output::success(&format!(
                "Removed {fingerprint} from keyring '{}'",
                store.id()
            ));
            Ok(())
        }
    }
}

async fn execute_list(ctx: &Context, keyring: Option<&str>) -> Result<()> {
    let store = ctx.keyring(keyring).await?;
    let key_data = store.get_key_data().await;

    output::header(&format!("Keys in '{}'", store.id()));
    if key_data.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for entry in key_data {
        println!("  {}  {}  {}", entry.key_id, entry.fingerprint, entry.user_id);
    }
    Ok(())
}

async fn execute_import(
    ctx: &Context,
    keyring: Option<&str>,
    bundle: KeyBundle,
    make_default: bool,
) -> Result<()> {
    let store = ctx.keyring(keyring).await?;
    let fingerprints: Vec<String> = bundle
        .public
        .iter()
        .chain(&bundle.private)
        .map(|k| k.fingerprint.clone())
        .collect();

    let summary = store.import_keys(bundle).await?;
    for fpr in &summary.added {
        output::success(&format!("Imported {fpr} into '{}'", store.id()));
    }
    for fpr in &summary.unchanged {
        output::warning(&format!("{fpr} already present in '{}'", store.id()));
    }

    if make_default {
        if let Some(fpr) = fingerprints.first() {
            store
                .set_attribute(DEFAULT_KEY_ATTR, Value::String(fpr.clone()))
                .await?;
            output::success(&format!("Default key of '{}' is now {fpr}", store.id()));
        }
    }
    Ok(())
}
