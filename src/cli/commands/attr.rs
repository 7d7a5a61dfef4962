use serde_json::Value;

use ringkeeper::core::errors::Result;
use ringkeeper::core::models::attributes::AttributeMap;

use crate::cli::AttrAction;
use crate::cli::context::Context;
use crate::cli::output;

/// Execute the `ringkeeper attr` command.
pub async fn execute(ctx: &Context, action: &AttrAction) -> Result<()> {
    match action {
        AttrAction::Get {
            keyring,
            name: Some(name),
        } => {
            match ctx.registry.get_keyring_attr(keyring, name).await? {
                Some(value) => println!("{}", display_value(&value)),
                None => output::warning(&format!("'{keyring}' has no attribute '{name}'")),
            }
            Ok(())
        }
        AttrAction::Get {
            keyring,
            name: None,
        } => {
            let attrs = ctx.registry.get_by_id(keyring).await?.attributes().await;
            println!("{}", serde_json::to_string_pretty(&attrs)?);
            Ok(())
        }
        AttrAction::Set {
            keyring,
            name,
            value,
        } => {
            let mut attrs = AttributeMap::new();
            attrs.insert(name.clone(), parse_value(value));
            ctx.registry.set_keyring_attr(keyring, attrs).await?;
            output::success(&format!("Set '{name}' on keyring '{keyring}'"));
            Ok(())
        }
    }
}

/// JSON if it parses as JSON, otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
