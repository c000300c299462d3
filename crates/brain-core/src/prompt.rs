//! Prompt fingerprints for tracking which instructions are deployed.

use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 hex fingerprint for a prompt string.
pub fn fingerprint(prompt: &str) -> String {
    Sha256::digest(prompt.as_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// First 12 hex characters of [`fingerprint`], for log lines.
pub fn short_fingerprint(prompt: &str) -> String {
    let mut full = fingerprint(prompt);
    full.truncate(12);
    full
}
