use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{KeyringError, Result};
use crate::core::services::keyring_registry::{MAIN_KEYRING_ID, RegistryConfig};
use crate::core::services::validation::validate_keyring_id;

/// Name of the optional config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration read from `<data dir>/config.toml`.
///
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub ringkeeper: RingkeeperSection,
    #[serde(default)]
    pub storage: StorageSection,
}

impl AppConfig {
    /// Load the configuration from `<data_dir>/config.toml`.
    ///
    /// After parsing, validates the keyring id and the storage file name so
    /// a tampered config cannot point storage outside the data directory.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    /// Parse and validate config file content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| KeyringError::InvalidConfig {
            detail: format!("Failed to parse {CONFIG_FILE}: {e}"),
        })?;

        validate_keyring_id(&config.ringkeeper.main_keyring).map_err(|e| {
            KeyringError::InvalidConfig {
                detail: format!("main_keyring: {e}"),
            }
        })?;
        validate_simple_filename(&config.storage.file, "storage file")?;
        config.registry_config()?;

        Ok(config)
    }

    /// Registry settings described by this config.
    pub fn registry_config(&self) -> Result<RegistryConfig> {
        Ok(RegistryConfig {
            main_keyring_id: self.ringkeeper.main_keyring.clone(),
            preferred: self.ringkeeper.preferred.parse()?,
        })
    }

    /// Path of the storage file inside `data_dir`.
    pub fn storage_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.storage.file)
    }
}

/// The `[ringkeeper]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RingkeeperSection {
    #[serde(default = "default_main_keyring")]
    pub main_keyring: String,
    /// `latest-private`, `main` or `keyring:<id>`.
    #[serde(default = "default_preferred")]
    pub preferred: String,
}

impl Default for RingkeeperSection {
    fn default() -> Self {
        Self {
            main_keyring: default_main_keyring(),
            preferred: default_preferred(),
        }
    }
}

fn default_main_keyring() -> String {
    MAIN_KEYRING_ID.to_string()
}

fn default_preferred() -> String {
    "latest-private".to_string()
}

/// The `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    #[serde(default = "default_storage_file")]
    pub file: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            file: default_storage_file(),
        }
    }
}

fn default_storage_file() -> String {
    "store.json".to_string()
}

/// Default data directory: `<platform data dir>/ringkeeper`.
pub fn default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| KeyringError::InvalidConfig {
        detail: "Could not determine data directory. Use --dir or RINGKEEPER_DIR.".into(),
    })?;
    Ok(data_dir.join("ringkeeper"))
}

/// Validate that a filename is a plain name without path components.
fn validate_simple_filename(name: &str, label: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(KeyringError::InvalidConfig {
            detail: format!("Invalid {label}: '{name}'. Must be a simple filename."),
        });
    }
    Ok(())
}
