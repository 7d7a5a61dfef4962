pub mod attr;
pub mod decrypt;
pub mod encrypt;
pub mod keyring;
pub mod keys;
pub mod sync;

use std::io::{Read, Write};
use std::path::Path;

use ringkeeper::core::errors::Result;

use crate::cli::context::Context;
use crate::cli::{Cli, Commands};

/// Open the data directory and run the selected command.
pub async fn run(args: &Cli) -> Result<()> {
    let ctx = Context::open(args).await?;

    match &args.command {
        Commands::Keyring { action } => keyring::execute(&ctx, action).await,
        Commands::Keys { action } => keys::execute(&ctx, action).await,
        Commands::Attr { action } => attr::execute(&ctx, action).await,
        Commands::Sync { keyring, key_ids } => sync::execute(&ctx, keyring, key_ids).await,
        Commands::Encrypt {
            keyring,
            recipients,
            sign,
            input,
            output,
        } => {
            encrypt::execute(
                &ctx,
                keyring.as_deref(),
                recipients,
                sign.as_deref(),
                input.as_deref(),
                output.as_deref(),
            )
            .await
        }
        Commands::Decrypt {
            keyring,
            key_ids,
            senders,
            self_signed,
            binary,
            input,
            output,
        } => {
            decrypt::execute(
                &ctx,
                decrypt::DecryptArgs {
                    keyring: keyring.as_deref(),
                    key_ids,
                    senders,
                    self_signed: *self_signed,
                    binary: *binary,
                    input: input.as_deref(),
                    output: output.as_deref(),
                },
            )
            .await
        }
    }
}

/// Read all input from a file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut data = Vec::new();
            std::io::stdin().lock().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

/// Write data to a file, or stdout when no path is given.
fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => Ok(std::fs::write(path, data)?),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
