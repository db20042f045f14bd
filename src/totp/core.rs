//! Core OTP generation — RFC 4226 (HOTP) windowed into RFC 6238 (TOTP).
//!
//! Implements HMAC-based One-Time Password with SHA-1, SHA-256 and
//! SHA-512, dynamic truncation, code verification with a configurable
//! drift window, and the display-formatting contract.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::totp::base32;
use crate::totp::clock;
use crate::totp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for the given raw key bytes and counter.
///
/// Deterministic: identical `(key, counter, digits, algorithm)` always
/// yields the identical code. The counter is serialised as 8 big-endian
/// bytes; the only failure path is the HMAC primitive rejecting the key.
pub fn hotp(key: &[u8], counter: u64, digits: u8, algorithm: Algorithm) -> Result<String, ComputeError> {
    let hmac_result = compute_hmac(key, &counter.to_be_bytes(), algorithm)?;
    Ok(truncate(&hmac_result, digits))
}

/// Compute HMAC(key, message) using the specified algorithm.
fn compute_hmac(key: &[u8], data: &[u8], algorithm: Algorithm) -> Result<Vec<u8>, ComputeError> {
    match algorithm {
        Algorithm::Sha1 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(key).map_err(|_| ComputeError::InvalidKey)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        Algorithm::Sha256 => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(key).map_err(|_| ComputeError::InvalidKey)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        Algorithm::Sha512 => {
            let mut mac =
                Hmac::<Sha512>::new_from_slice(key).map_err(|_| ComputeError::InvalidKey)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}

/// Dynamic truncation per RFC 4226 §5.3.
///
/// The top bit of the extracted 31-bit value is cleared to avoid signed
/// interpretation differences across platforms.
fn truncate(hmac_result: &[u8], digits: u8) -> String {
    let offset = (hmac_result[hmac_result.len() - 1] & 0x0f) as usize;
    let binary = ((hmac_result[offset] as u32 & 0x7f) << 24)
        | ((hmac_result[offset + 1] as u32) << 16)
        | ((hmac_result[offset + 2] as u32) << 8)
        | (hmac_result[offset + 3] as u32);
    let modulus = 10u32.pow(digits as u32);
    let code = binary % modulus;
    format!("{:0>width$}", code, width = digits as usize)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret-level helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate an HOTP code straight from a base-32 encoded secret.
pub fn generate_hotp(
    secret_b32: &str,
    counter: u64,
    digits: u8,
    algorithm: Algorithm,
) -> Result<String, OtpError> {
    let key = base32::decode(secret_b32)?;
    Ok(hotp(&key, counter, digits, algorithm)?)
}

/// Generate a TOTP code from a base-32 secret at an explicit unix timestamp.
pub fn generate_totp_at(
    secret_b32: &str,
    digits: u8,
    period_seconds: u32,
    algorithm: Algorithm,
    unix_seconds: u64,
) -> Result<String, OtpError> {
    let (counter, _) = clock::counter_and_remaining(unix_seconds, period_seconds);
    generate_hotp(secret_b32, counter, digits, algorithm)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Verification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Verify a submitted code against an account at a specific timestamp.
///
/// `drift_window` is the number of time-steps checked on either side of
/// the current one (1 checks ±1).
pub fn verify_at(
    account: &Account,
    code: &str,
    drift_window: u32,
    unix_seconds: u64,
) -> Result<VerifyResult, OtpError> {
    let key = base32::decode(&account.secret)?;
    let (base_counter, _) = clock::counter_and_remaining(unix_seconds, account.period_seconds);

    // The submitted code must be digits only, at the expected length.
    if code.len() != account.digits as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(VerifyResult {
            valid: false,
            drift: 0,
            matched_counter: None,
        });
    }

    let start = base_counter.saturating_sub(drift_window as u64);
    let end = base_counter + drift_window as u64;
    for c in start..=end {
        let generated = hotp(&key, c, account.digits, account.algorithm)?;
        if constant_time_eq(generated.as_bytes(), code.as_bytes()) {
            return Ok(VerifyResult {
                valid: true,
                drift: c as i64 - base_counter as i64,
                matched_counter: Some(c),
            });
        }
    }

    Ok(VerifyResult {
        valid: false,
        drift: 0,
        matched_counter: None,
    })
}

/// Constant-time comparison (to prevent timing attacks on code verification).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Display formatting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Format an OTP code with a space in the middle (e.g. "123 456").
pub fn format_code_display(code: &str) -> String {
    if code.len() <= 4 {
        return code.to_string();
    }
    let mid = code.len() / 2;
    format!("{} {}", &code[..mid], &code[mid..])
}

/// What a copy action places on the clipboard: the digits, no spaces.
pub fn clipboard_text(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}
