//! Core types for the TOTP engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
///
/// SHA-1 is the interoperability default mandated by third-party TOTP
/// validators, not a strength statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha512 => write!(f, "SHA512"),
        }
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One third-party credential enrolled for 2FA.
///
/// The secret is kept exactly as typed or scanned; this core never
/// mutates it. Enrollment and removal are the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: String,
    /// Issuer (e.g. "GitHub", "Google").
    pub issuer: Option<String>,
    /// Account label (e.g. "user@example.com").
    pub label: String,
    /// Base-32 encoded secret key.
    pub secret: String,
    /// Hash algorithm.
    pub algorithm: Algorithm,
    /// Number of digits in the generated code (6 or 8).
    pub digits: u8,
    /// Time-step length in seconds (typically 30). Must be non-zero.
    pub period_seconds: u32,
    /// Custom tags for filtering and colouring in the shell.
    pub tags: Vec<String>,
}

impl Account {
    /// Create a minimal TOTP account with the conventional defaults.
    pub fn new(label: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            issuer: None,
            label: label.into(),
            secret: secret.into(),
            algorithm: Algorithm::default(),
            digits: 6,
            period_seconds: 30,
            tags: Vec::new(),
        }
    }

    /// Builder: set an explicit ID (callers with their own ID scheme).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: set issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algo: Algorithm) -> Self {
        self.algorithm = algo;
        self
    }

    /// Builder: set digit count.
    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    /// Builder: set time-step length.
    pub fn with_period_seconds(mut self, period_seconds: u32) -> Self {
        self.period_seconds = period_seconds;
        self
    }

    /// Builder: set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Display name: "Issuer (label)" or just "label".
    pub fn display_name(&self) -> String {
        match &self.issuer {
            Some(iss) if !iss.is_empty() => format!("{} ({})", iss, self.label),
            _ => self.label.clone(),
        }
    }

    /// Check if the secret decodes to at least one key byte.
    pub fn is_secret_valid(&self) -> bool {
        crate::totp::base32::is_valid(&self.secret)
    }

    /// Normalise the secret (uppercase, ASCII spaces stripped).
    pub fn normalised_secret(&self) -> String {
        crate::totp::base32::normalise(&self.secret)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-account display state driven by the scheduler.
///
/// `Invalid` is terminal (the secret does not decode); `Error` is
/// transient (an HMAC computation failed) and is retried on the next
/// tick. The `"Error"` sentinel string only exists at the presentation
/// boundary, never inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CodeState {
    /// No code computed yet.
    Pending,
    /// A current code, valid for the remainder of its time-step.
    Ready { code: String, remaining_seconds: u32 },
    /// The secret failed base-32 decoding; permanent.
    Invalid,
    /// HOTP computation failed on the last attempt; retried next tick.
    Error,
}

impl CodeState {
    /// Project to the display string contract: the digits for `Ready`,
    /// `"------"` while pending, the literal `"Error"` otherwise.
    pub fn display_code(&self) -> String {
        match self {
            Self::Pending => "------".to_string(),
            Self::Ready { code, .. } => code.clone(),
            Self::Invalid | Self::Error => "Error".to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code snapshot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the scheduler hands to the presentation layer on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnapshot {
    /// Account this snapshot belongs to.
    pub account_id: String,
    /// Current display state.
    pub state: CodeState,
    /// Seconds left in the current time-step (always in `1..=period`).
    pub remaining_seconds: u32,
    /// Total time-step length in seconds.
    pub period_seconds: u32,
}

impl CodeSnapshot {
    /// Display string per the presentation contract.
    pub fn display_code(&self) -> String {
        self.state.display_code()
    }

    /// Progress fraction (0.0 = fresh code, approaching 1.0 = about to expire).
    pub fn progress(&self) -> f64 {
        1.0 - self.remaining_seconds as f64 / self.period_seconds as f64
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Verification result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of verifying a submitted OTP code against an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    /// How many time-steps off the match was (0 = exact).
    pub drift: i64,
    /// The time-step that matched (if any).
    pub matched_counter: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Base-32 secret decoding failure. Marks the owning account `Invalid`;
/// never fatal to the process or to other accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum DecodeError {
    /// A character outside `A–Z2–7` after normalisation.
    #[error("invalid base-32 character {0:?}")]
    InvalidCharacter(char),
    /// The input decoded to zero key bytes.
    #[error("secret decodes to zero bytes")]
    EmptyResult,
}

/// HOTP computation failure. The owning account shows `Error` for the
/// current tick and retries on the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ComputeError {
    /// The HMAC primitive rejected the key.
    #[error("HMAC rejected the key")]
    InvalidKey,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum OtpError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error("account not found: {0}")]
    AccountNotFound(String),
}
