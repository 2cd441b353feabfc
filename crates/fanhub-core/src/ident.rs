//! Client identifier generation.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Generates a fresh client identifier.
///
/// Identifiers carry 128 bits of entropy and are encoded as URL-safe
/// base64 without padding, yielding 22 characters.
pub fn generate_client_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_length() {
        let id = generate_client_id();
        assert_eq!(id.len(), 22);
    }

    #[test]
    fn test_id_charset() {
        let id = generate_client_id();
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_ids_unique() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_ne!(a, b);
    }
}
