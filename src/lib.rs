//! Multi-keyring key management.
//!
//! A [`KeyringRegistry`](crate::core::services::keyring_registry::KeyringRegistry)
//! owns named keyrings persisted through a [`Storage`](crate::core::traits::storage::Storage)
//! port. [`CryptoService`](crate::core::services::crypto_service::CryptoService)
//! combines one keyring with a [`CryptoBackend`](crate::core::traits::crypto::CryptoBackend)
//! and a [`KeyUnlocker`](crate::core::traits::unlock::KeyUnlocker) to decrypt and
//! verify or to encrypt and sign.

pub mod adapters;
pub mod config;
pub mod core;
