//! Extension token generation, hashing, and bearer parsing.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// Number of random bytes behind each token.
pub const TOKEN_SECRET_BYTES: usize = 48;

/// Shortest token the verifier will even look up.
pub const MIN_TOKEN_CHARS: usize = 32;

const BEARER_SCHEME: &str = "bearer";

#[derive(Clone)]
pub struct TokenSecret {
    bytes: [u8; TOKEN_SECRET_BYTES],
}

impl TokenSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TOKEN_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_SECRET_BYTES] {
        &self.bytes
    }

    /// URL-safe text form handed to the client.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes)
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(**redacted**)")
    }
}

impl Drop for TokenSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Structural problems with a presented credential.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("authorization header is missing")]
    MissingHeader,

    #[error("authorization scheme is not bearer")]
    UnsupportedScheme,

    #[error("bearer token is shorter than {MIN_TOKEN_CHARS} characters")]
    TooShort,
}

#[must_use]
pub fn generate_token_secret() -> TokenSecret {
    let mut secret = [0_u8; TOKEN_SECRET_BYTES];

    OsRng.fill_bytes(&mut secret);

    TokenSecret::from_bytes(secret)
}

/// Storage form of a token: lowercase hex SHA-256.
#[must_use]
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Reject tokens that cannot have been issued here.
///
/// # Errors
///
/// Returns [`TokenError::TooShort`] for tokens under [`MIN_TOKEN_CHARS`].
pub fn validate_token(token: &str) -> Result<&str, TokenError> {
    if token.chars().count() < MIN_TOKEN_CHARS {
        return Err(TokenError::TooShort);
    }

    Ok(token)
}

/// Extract the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns a [`TokenError`] when the header is absent, uses another scheme, or
/// carries a token that is too short.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, TokenError> {
    let value = header.ok_or(TokenError::MissingHeader)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(TokenError::UnsupportedScheme)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(TokenError::UnsupportedScheme);
    }

    validate_token(token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_TOKEN: &str = "0123456789abcdef0123456789abcdef0123";

    #[test]
    fn generated_tokens_are_url_safe_and_unique() {
        let first = generate_token_secret().encode();
        let second = generate_token_secret().encode();

        assert_eq!(first.len(), 64, "48 bytes encode to 64 unpadded chars");
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "token must be URL safe: {first}"
        );
        assert_ne!(first, second);
    }

    #[test]
    fn hash_is_deterministic_hex_sha256() {
        let hash = hash_token("abc");

        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash, hash_token("abc"));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = TokenSecret::from_bytes([0xAB; TOKEN_SECRET_BYTES]);

        assert_eq!(format!("{secret:?}"), "TokenSecret(**redacted**)");
    }

    #[test]
    fn parse_bearer_accepts_case_insensitive_scheme() {
        let header = format!("bEaReR {LONG_TOKEN}");

        assert_eq!(parse_bearer(Some(&header)), Ok(LONG_TOKEN));
    }

    #[test]
    fn parse_bearer_rejects_missing_header() {
        assert_eq!(parse_bearer(None), Err(TokenError::MissingHeader));
    }

    #[test]
    fn parse_bearer_rejects_other_schemes() {
        let header = format!("Basic {LONG_TOKEN}");

        assert_eq!(
            parse_bearer(Some(&header)),
            Err(TokenError::UnsupportedScheme)
        );
        assert_eq!(
            parse_bearer(Some("Bearer")),
            Err(TokenError::UnsupportedScheme)
        );
    }

    #[test]
    fn parse_bearer_rejects_short_tokens() {
        assert_eq!(
            parse_bearer(Some("Bearer abc123")),
            Err(TokenError::TooShort)
        );
        assert_eq!(parse_bearer(Some("Bearer   x")), Err(TokenError::TooShort));
    }
}
