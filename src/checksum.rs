//! Artifact checksums.
//!
//! A single canonical digest (SHA-256, lower-case hex) computed over the
//! in-memory artifact content, carried alongside each replica write so the
//! stored object can be verified later.

use sha2::{Digest, Sha256};

/// SHA-256 of `content` as a lower-case hex string.
#[must_use]
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Checks `content` against an expected hex digest (case-insensitive).
#[must_use]
pub fn verify(content: &[u8], expected: &str) -> bool {
    sha256_hex(content).eq_ignore_ascii_case(expected)
}
