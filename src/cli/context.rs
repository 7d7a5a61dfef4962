use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::debug;

use ringkeeper::adapters::storage::file_storage::FileStorage;
use ringkeeper::adapters::unlock::passphrase_unlocker::PassphraseUnlocker;
use ringkeeper::config::app_config::{AppConfig, default_data_dir};
use ringkeeper::core::errors::Result;
use ringkeeper::core::services::key_store::KeyStore;
use ringkeeper::core::services::keyring_registry::KeyringRegistry;

use crate::cli::Cli;

/// Everything a command needs: resolved data directory, config and an
/// initialized registry over the file store.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub registry: KeyringRegistry,
    passphrase: Option<String>,
}

impl Context {
    /// Resolve the data directory, load config and open the registry.
    pub async fn open(args: &Cli) -> Result<Self> {
        let data_dir = match &args.dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let config = AppConfig::load(&data_dir)?;
        let storage_path = config.storage_path(&data_dir);
        debug!(dir = %data_dir.display(), storage = %storage_path.display(), "opening key store");

        let registry = KeyringRegistry::new(
            Arc::new(FileStorage::new(storage_path)),
            config.registry_config()?,
        );
        registry.init().await?;

        Ok(Self {
            data_dir,
            config,
            registry,
            passphrase: args.passphrase.clone(),
        })
    }


    /// The named keyring, or the preferred one when no name is given.
    pub async fn keyring(&self, id: Option<&str>) -> Result<Arc<KeyStore>> {
        match id {
            Some(id) => self.registry.get_by_id(id).await,
            None => self.registry.get_preferred_keyring().await,
        }
    }

    pub fn passphrase(&self) -> Option<SecretString> {
        self.passphrase.clone().map(SecretString::from)
    }

    pub fn unlocker(&self) -> PassphraseUnlocker {
        PassphraseUnlocker::new(self.passphrase())
    }
}
