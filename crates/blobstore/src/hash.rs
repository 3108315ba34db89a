//! SHA-1 content addressing

use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// Hex SHA-1 digest of `content`
pub fn hash_content(content: &[u8]) -> String {
    hex::encode(Sha1::digest(content))
}

/// True for a 40 character lowercase hex string
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 40 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Reject anything that is not a content hash, so it can be used in paths and URLs
pub fn validate_hash(hash: &str) -> Result<()> {
    if is_valid_hash(hash) {
        Ok(())
    } else {
        Err(Error::InvalidHash(hash.to_string()))
    }
}

/// Check `content` hashes to `expected`
pub fn verify(expected: &str, content: &[u8]) -> Result<()> {
    let actual = hash_content(content);
    if actual == expected {
        Ok(())
    } else {
        Err(Error::IntegrityMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(hash_content(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(hash_content(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_hash_validation() {
        assert!(is_valid_hash("a9993e364706816aba3e25717850c26c9cd0d89d"));
        assert!(!is_valid_hash("A9993E364706816ABA3E25717850C26C9CD0D89D"));
        assert!(!is_valid_hash("../etc/passwd"));
        assert!(validate_hash("abc").is_err());
    }

    #[test]
    fn test_verify_detects_mismatch() {
        assert!(verify("a9993e364706816aba3e25717850c26c9cd0d89d", b"abc").is_ok());
        let err = verify("a9993e364706816aba3e25717850c26c9cd0d89d", b"abd").unwrap_err();
        assert!(matches!(err, Error::IntegrityMismatch { .. }));
    }
}
