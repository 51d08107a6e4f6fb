use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh reset token: 32 random bytes, hex encoded. The raw value
/// goes into the email link; only its hash is stored.
pub fn generate() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_64_hex_chars() {
        let token = generate();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate());
    }

    #[test]
    fn test_hash_is_stable_and_distinct_from_token() {
        let token = "a".repeat(64);
        let hashed = hash(&token);
        assert_eq!(hashed, hash(&token));
        assert_ne!(hashed, token);
        assert_eq!(hashed.len(), 64);
    }
}
