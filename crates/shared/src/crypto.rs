//! Cryptographic utilities for hashing, webhook signatures and random tokens.

use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes an HMAC-SHA256 of `payload` keyed with `secret`, hex encoded.
pub fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length, new_from_slice cannot fail here.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex encoded HMAC-SHA256 signature in constant time.
///
/// Accepts signatures with or without the `sha256=` prefix used by most
/// webhook providers. Returns `false` for malformed hex.
pub fn verify_hmac_sha256(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let expected = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Generates a random alphanumeric token of the given length.
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty_string() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 style check with a simple key/message pair
        let sig = hmac_sha256_hex("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_verify_hmac_accepts_valid_signature() {
        let body = br#"{"event":"quote.created"}"#;
        let sig = hmac_sha256_hex("s3cret", body);
        assert!(verify_hmac_sha256("s3cret", body, &sig));
        assert!(verify_hmac_sha256("s3cret", body, &format!("sha256={}", sig)));
    }

    #[test]
    fn test_verify_hmac_rejects_tampered_payload() {
        let sig = hmac_sha256_hex("s3cret", b"original");
        assert!(!verify_hmac_sha256("s3cret", b"tampered", &sig));
    }

    #[test]
    fn test_verify_hmac_rejects_wrong_secret() {
        let sig = hmac_sha256_hex("s3cret", b"payload");
        assert!(!verify_hmac_sha256("other", b"payload", &sig));
    }

    #[test]
    fn test_verify_hmac_rejects_malformed_hex() {
        assert!(!verify_hmac_sha256("s3cret", b"payload", "not-hex"));
        assert!(!verify_hmac_sha256("s3cret", b"payload", ""));
    }

    #[test]
    fn test_random_token_length_and_charset() {
        let token = random_token(32);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(random_token(32), token);
    }
}
