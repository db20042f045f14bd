//! # authset – TOTP engine
//!
//! Rotating one-time-password core of the authset authenticator:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP generation with SHA-1, SHA-256, SHA-512
//! - **Strict base-32** – secret decoding with per-character error reporting
//! - **Injectable clock** – every time-dependent operation takes or derives
//!   an explicit unix timestamp, so tests never touch the wall clock
//! - **Per-account schedulers** – each enrolled account owns its decoded key,
//!   cached time-step and display state; codes are recomputed only when the
//!   time-step advances, and one broken secret never disturbs another account
//! - **Async service** – one independent ticker task per account, publishing
//!   code snapshots on a watch channel, cancelled cleanly on removal

pub mod totp;
