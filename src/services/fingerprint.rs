//! Stable issue identifiers.
//!
//! Issue ids are a deterministic hash of the producing service, the
//! issue's ordinal within that service, and its title. Re-transforming
//! the same terminal job yields the same ids, so exports and UI
//! selection survive refreshes.

use sha2::{Digest, Sha256};

/// Compute an issue id.
pub fn issue_id(service: &str, position: usize, title: &str) -> String {
    hash(&format!("{service}:{position}:{title}"))
}

/// SHA-256 hash a string and return hex-encoded digest.
fn hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
