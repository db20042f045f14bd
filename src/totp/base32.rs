//! Base-32 secret codec (RFC 4648 standard alphabet).
//!
//! Decoding is strict about the alphabet but lenient about shape:
//! ASCII spaces are stripped, case is folded, trailing `=` padding is
//! accepted and ignored, and trailing bits that do not fill a complete
//! byte are dropped. This matches how authenticator apps treat
//! human-typed shared secrets.

use crate::totp::types::DecodeError;

/// Normalise a typed secret: strip ASCII spaces, fold to uppercase.
pub fn normalise(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Decode a base-32 secret into raw key bytes.
///
/// Pure function: same input, same output, no side effects. Errors are
/// recoverable by the caller (the owning account is marked invalid).
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    let cleaned = normalise(text);
    let trimmed = cleaned.trim_end_matches('=');

    let mut out = Vec::with_capacity(trimmed.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for ch in trimmed.chars() {
        let value = match ch {
            'A'..='Z' => ch as u32 - 'A' as u32,
            '2'..='7' => ch as u32 - '2' as u32 + 26,
            other => return Err(DecodeError::InvalidCharacter(other)),
        };
        acc = (acc << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    // Trailing bits short of a full byte are dropped, not rejected.

    if out.is_empty() {
        return Err(DecodeError::EmptyResult);
    }
    Ok(out)
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode(bytes: &[u8]) -> String {
    ::base32::encode(::base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Generate a cryptographically-random base-32 secret.
pub fn generate_secret(byte_length: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut buf);
    encode(&buf)
}

/// Check if a string decodes to at least one key byte.
pub fn is_valid(text: &str) -> bool {
    decode(text).is_ok()
}
