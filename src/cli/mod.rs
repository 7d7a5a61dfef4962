pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keep several keyrings apart. Decrypt, verify, encrypt against any of them.
#[derive(Parser, Debug)]
#[command(name = "ringkeeper", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding config.toml and the key store
    #[arg(long, global = true, env = "RINGKEEPER_DIR")]
    pub dir: Option<PathBuf>,

    /// Passphrase for protected private keys
    #[arg(
        long,
        global = true,
        env = "RINGKEEPER_PASSPHRASE",
        hide_env_values = true
    )]
    pub passphrase: Option<String>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, delete and list keyrings
    Keyring {
        #[command(subcommand)]
        action: KeyringAction,
    },

    /// Manage the keys of one keyring
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Read or write keyring attributes
    Attr {
        #[command(subcommand)]
        action: AttrAction,
    },

    /// Copy public keys from other keyrings into one keyring
    Sync {
        /// Destination keyring
        #[arg(long)]
        keyring: String,
        /// Key IDs or fingerprints to copy
        #[arg(required = true)]
        key_ids: Vec<String>,
    },

    /// Encrypt data for keys of a keyring
    Encrypt {
        /// Keyring to use (default: preferred keyring)
        #[arg(long)]
        keyring: Option<String>,
        /// Recipient fingerprint. Repeat for several recipients.
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,
        /// Fingerprint of the private key to sign with
        #[arg(long)]
        sign: Option<String>,
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a message and verify its signatures
    Decrypt {
        /// Keyring to use (default: preferred keyring)
        #[arg(long)]
        keyring: Option<String>,
        /// Decryption key ID (default: the keyring's default key)
        #[arg(long = "key")]
        key_ids: Vec<String>,
        /// Sender address whose keys may have signed the message
        #[arg(long = "from")]
        senders: Vec<String>,
        /// Message is signed with the decryption key itself
        #[arg(long)]
        self_signed: bool,
        /// Write raw bytes instead of requiring UTF-8
        #[arg(long)]
        binary: bool,
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyringAction {
    /// List keyrings in creation order
    List,
    /// Create an empty keyring
    Create {
        /// Keyring id (letters, digits, '-' and '_')
        id: String,
    },
    /// Delete a keyring with all its keys and attributes
    Delete {
        /// Keyring id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// List user identities bound to the keyring's keys
    List {
        /// Keyring to use (default: preferred keyring)
        #[arg(long)]
        keyring: Option<String>,
    },
    /// Import a public recipient or a private identity file
    Import {
        /// Target keyring (default: preferred keyring)
        #[arg(long)]
        keyring: Option<String>,
        /// Public age recipient (age1…)
        #[arg(long, conflicts_with = "identity", required_unless_present = "identity")]
        recipient: Option<String>,
        /// Private age identity file, plain or passphrase-protected
        #[arg(long)]
        identity: Option<PathBuf>,
        /// User ID to bind, e.g. "Max <max@example.com>". Repeatable.
        #[arg(long = "uid")]
        user_ids: Vec<String>,
        /// Make the imported key the keyring's default key
        #[arg(long)]
        default: bool,
    },
    /// Remove a key by fingerprint
    Remove {
        /// Keyring to use (default: preferred keyring)
        #[arg(long)]
        keyring: Option<String>,
        /// Fingerprint of the key to remove
        fingerprint: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AttrAction {
    /// Print one attribute, or all of them
    Get {
        /// Keyring id
        #[arg(long)]
        keyring: String,
        /// Attribute name (default: every attribute)
        name: Option<String>,
    },
    /// Set one attribute. JSON values are stored as JSON, anything else as a string.
    Set {
        /// Keyring id
        #[arg(long)]
        keyring: String,
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
}
