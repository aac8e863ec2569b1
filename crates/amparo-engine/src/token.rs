//! Reservation bearer token generation and hashing.
//!
//! Tokens are capability credentials: possession is sufficient to view,
//! confirm, or cancel a reservation. They are generated from the operating
//! system's CSPRNG, handed to the caller exactly once, and only their
//! SHA-256 hash is persisted or compared. Log statements use
//! [`redact_token`].

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Token entropy in bytes (256 bits).
const TOKEN_BYTES: usize = 32;

/// Characters of the token kept visible in logs.
const REDACT_VISIBLE_CHARS: usize = 8;

/// Generate a reservation bearer token: 32 random bytes, hex-encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a token with SHA-256 for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Redacted form of a token, safe for log output.
#[must_use]
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(REDACT_VISIBLE_CHARS).collect();
    format!("{visible}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..64).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 64);
    }

    #[test]
    fn test_hash_is_stable_and_distinct_from_token() {
        let token = generate_token();
        let h1 = hash_token(&token);
        let h2 = hash_token(&token);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, token);
    }

    #[test]
    fn test_different_tokens_hash_differently() {
        assert_ne!(hash_token("a"), hash_token("b"));
    }

    #[test]
    fn test_redaction_hides_the_tail() {
        let token = generate_token();
        let redacted = redact_token(&token);
        assert!(redacted.len() < token.len());
        assert!(token.starts_with(redacted.trim_end_matches('…')));
    }
}
