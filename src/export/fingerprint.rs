//! Deterministic store addressing.
//!
//! A fingerprint is the SHA-256 of the canonical JSON encoding of every
//! parameter that influences the materialized samples. Equal parameters give
//! the same store directory; changing any of them gives a disjoint one.

use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex characters of the fingerprint used in directory names.
pub const DIR_FINGERPRINT_LEN: usize = 16;

/// Prefix of every store directory.
pub const STORE_DIR_PREFIX: &str = "transformed_";

/// Lowercase hex SHA-256 of `input`'s JSON encoding.
pub fn fingerprint<T: Serialize + ?Sized>(input: &T) -> Result<String> {
    let bytes = serde_json::to_vec(input)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Store directory name for a fingerprint.
pub fn store_dir_name(fingerprint: &str) -> String {
    let short = &fingerprint[..fingerprint.len().min(DIR_FINGERPRINT_LEN)];
    format!("{STORE_DIR_PREFIX}{short}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Params {
        neighbors: usize,
        discard: bool,
    }

    #[test]
    fn test_stable_and_sensitive() {
        let a = fingerprint(&Params { neighbors: 2, discard: true }).unwrap();
        let b = fingerprint(&Params { neighbors: 2, discard: true }).unwrap();
        let c = fingerprint(&Params { neighbors: 4, discard: true }).unwrap();
        let d = fingerprint(&Params { neighbors: 2, discard: false }).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_store_dir_name() {
        let fp = fingerprint(&Params { neighbors: 0, discard: true }).unwrap();
        let name = store_dir_name(&fp);
        assert!(name.starts_with(STORE_DIR_PREFIX));
        assert_eq!(name.len(), STORE_DIR_PREFIX.len() + DIR_FINGERPRINT_LEN);
    }
}
