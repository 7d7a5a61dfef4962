use colored::Colorize;

use ringkeeper::core::models::signature::{Signature, SignatureValidity};

/// Print a success message.
pub fn success(msg: &str) {
    eprintln!("  {} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    println!("\n{}", msg.bold());
}

/// Print one verified signature.
pub fn signature(sig: &Signature) {
    let signer = sig.fingerprint.as_deref().unwrap_or(&sig.key_id);
    match sig.validity {
        SignatureValidity::Valid => success(&format!("Good signature from {signer}")),
        SignatureValidity::Invalid => {
            error(&format!("Bad signature from {signer}"));
        }
        SignatureValidity::Unresolved => {
            warning(&format!("Signature by unknown key {}", sig.key_id));
        }
    }
}
