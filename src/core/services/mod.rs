pub mod attribute_store;
pub mod crypto_service;
pub mod key_store;
pub mod keyring_registry;
pub mod validation;
