//! Content hashing for change detection.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Lowercase hex SHA-256 of `content`.
pub fn calculate_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            calculate_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_any_change_changes_hash() {
        let a = calculate_hash("class A {}");
        assert_eq!(a, calculate_hash("class A {}"));
        assert_ne!(a, calculate_hash("class A { }"));
        assert_eq!(a.len(), 64);
    }
}
