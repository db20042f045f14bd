//! TOTP engine: sub-modules.

pub mod types;
pub mod base32;
pub mod core;
pub mod clock;
pub mod scheduler;
pub mod service;

// Re-export top-level items for convenience.
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::AccountScheduler;
pub use service::{OtpService, OtpServiceState};
