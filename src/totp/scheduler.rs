//! Per-account code scheduler.
//!
//! Each enrolled account gets its own `AccountScheduler`: it decodes
//! the secret exactly once, caches the last time-step it computed a
//! code for, and on every tick either refreshes the countdown or, when
//! the time-step advances, recomputes the code. Schedulers share
//! nothing, so one broken secret never affects another account.

use log::{debug, warn};

use crate::totp::base32;
use crate::totp::clock;
use crate::totp::core;
use crate::totp::types::*;

/// State machine driving one account's rotating code.
///
/// States: `Pending` → `Ready` (re-entered each tick) with `Invalid`
/// (terminal, secret failed to decode) and `Error` (transient HMAC
/// failure, retried on the next tick) as the failure branches. Within
/// one scheduler, `Ready` codes are observed in non-decreasing
/// time-step order as long as the supplied timestamps are monotonic.
pub struct AccountScheduler {
    account: Account,
    /// Decoded key bytes; `None` means the secret was rejected and the
    /// scheduler is permanently `Invalid`.
    key: Option<Vec<u8>>,
    /// Time-step of the last code computation attempt.
    last_counter: Option<u64>,
    state: CodeState,
}

impl AccountScheduler {
    /// Decode the secret and set up the initial state.
    ///
    /// A bad secret is not an error to the caller: the scheduler is
    /// created in the `Invalid` state and keeps showing the sentinel.
    pub fn new(account: Account) -> Self {
        let (key, state) = match base32::decode(&account.secret) {
            Ok(key) => (Some(key), CodeState::Pending),
            Err(err) => {
                warn!("account {}: secret rejected: {}", account.id, err);
                (None, CodeState::Invalid)
            }
        };
        Self {
            account,
            key,
            last_counter: None,
            state,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn state(&self) -> &CodeState {
        &self.state
    }

    /// Advance the state machine to `now_unix` and report a snapshot.
    ///
    /// The HOTP code is recomputed only when the time-step changes (or
    /// when leaving `Pending`/`Error`); otherwise only the countdown is
    /// refreshed, so the hash runs once per period, not once per second.
    pub fn tick(&mut self, now_unix: u64) -> CodeSnapshot {
        let (counter, remaining) =
            clock::counter_and_remaining(now_unix, self.account.period_seconds);

        if let Some(key) = &self.key {
            let needs_code =
                self.last_counter != Some(counter) || !self.state.is_ready();
            if needs_code {
                match core::hotp(key, counter, self.account.digits, self.account.algorithm) {
                    Ok(code) => {
                        debug!(
                            "account {}: new code at step {}",
                            self.account.id, counter
                        );
                        self.state = CodeState::Ready {
                            code,
                            remaining_seconds: remaining,
                        };
                    }
                    Err(err) => {
                        warn!(
                            "account {}: code computation failed at step {}: {}",
                            self.account.id, counter, err
                        );
                        self.state = CodeState::Error;
                    }
                }
                self.last_counter = Some(counter);
            } else if let CodeState::Ready {
                remaining_seconds, ..
            } = &mut self.state
            {
                *remaining_seconds = remaining;
            }
        }
        // `Invalid` is terminal: nothing to recompute, ever.

        CodeSnapshot {
            account_id: self.account.id.clone(),
            state: self.state.clone(),
            remaining_seconds: remaining,
            period_seconds: self.account.period_seconds,
        }
    }
}
