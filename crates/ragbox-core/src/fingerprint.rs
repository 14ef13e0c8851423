//! Content fingerprints.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of a document's UTF-8
//! content bytes. It is the only change-detection signal the sync protocol
//! uses; metadata never contributes to it.

use sha2::{Digest, Sha256};

/// Length of a fingerprint string in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// Compute the fingerprint of `content`.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check whether `value` looks like a fingerprint (64 lowercase hex chars).
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
