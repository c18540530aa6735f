//! Small hashing helpers used to build stable, short Redis key fragments.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `input`, truncated to `len` characters.
///
/// Used for the User-Agent fingerprint (`ua_hash`, 8 chars) and for the
/// m3u8 URL fingerprint embedded in the adaptive counter key (16 chars).
pub fn sha256_hex_prefix(input: &str, len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let full = hex::encode(digest);
    full[..len.min(full.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_and_truncated() {
        let a = sha256_hex_prefix("Mozilla/5.0", 8);
        let b = sha256_hex_prefix("Mozilla/5.0", 8);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn distinct_inputs_differ() {
        assert_ne!(
            sha256_hex_prefix("a", 8),
            sha256_hex_prefix("b", 8)
        );
    }
}
