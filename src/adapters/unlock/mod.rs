pub mod passphrase_unlocker;
