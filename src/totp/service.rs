//! High-level orchestrator — owns one scheduler and ticker task per
//! enrolled account.
//!
//! Every account gets an independent 1 s tick stream; snapshots are
//! published on a watch channel so any number of views can follow one
//! account without polling the engine. Removing an account (or dropping
//! the service) aborts its task: no orphaned timers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::totp::clock::{Clock, SystemClock};
use crate::totp::scheduler::AccountScheduler;
use crate::totp::types::*;

/// Thread-safe service state shared with the host shell.
pub type OtpServiceState = Arc<Mutex<OtpService>>;

/// One account's scheduler, ticker task and snapshot channel.
///
/// The scheduler sits behind its own mutex: per-account locking only,
/// never a lock spanning accounts.
struct AccountRunner {
    scheduler: Arc<Mutex<AccountScheduler>>,
    snapshots: watch::Receiver<CodeSnapshot>,
    ticker: JoinHandle<()>,
}

impl Drop for AccountRunner {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

/// Central OTP service.
pub struct OtpService {
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    runners: HashMap<String, AccountRunner>,
}

impl OtpService {
    /// Create a new service on the system clock, wrapped for sharing
    /// with the host.
    pub fn new() -> OtpServiceState {
        Arc::new(Mutex::new(Self::with_clock(Arc::new(SystemClock))))
    }

    /// Create a service with an injected clock (tests, replay hosts).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tick_interval: Duration::from_secs(1),
            runners: HashMap::new(),
        }
    }

    /// Builder: override the tick cadence (defaults to one second).
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Enrollment
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Enroll an account and start its tick stream. Returns the ID.
    ///
    /// An account with an undecodable secret is still enrolled; its
    /// stream permanently reports the `Invalid` state and no other
    /// account is affected.
    pub async fn add_account(&mut self, account: Account) -> String {
        let id = account.id.clone();
        let scheduler = Arc::new(Mutex::new(AccountScheduler::new(account)));

        // Seed the channel so subscribers see a snapshot immediately.
        let first = scheduler.lock().await.tick(self.clock.now_unix());
        let (tx, rx) = watch::channel(first);

        let ticker = tokio::spawn(Self::run_ticker(
            scheduler.clone(),
            tx,
            self.clock.clone(),
            self.tick_interval,
        ));
        self.runners.insert(
            id.clone(),
            AccountRunner {
                scheduler,
                snapshots: rx,
                ticker,
            },
        );
        debug!("account {} enrolled", id);
        id
    }

    /// Stop an account's tick stream and forget it.
    pub fn remove_account(&mut self, id: &str) -> Result<(), OtpError> {
        match self.runners.remove(id) {
            Some(runner) => {
                drop(runner); // aborts the ticker
                debug!("account {} removed", id);
                Ok(())
            }
            None => Err(OtpError::AccountNotFound(id.to_string())),
        }
    }

    /// Stop every tick stream and forget all accounts.
    pub fn clear(&mut self) {
        self.runners.clear();
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// IDs of all enrolled accounts (no cross-account ordering).
    pub fn account_ids(&self) -> Vec<String> {
        self.runners.keys().cloned().collect()
    }

    /// Copies of all enrolled accounts.
    pub async fn list_accounts(&self) -> Vec<Account> {
        let mut accounts = Vec::with_capacity(self.runners.len());
        for runner in self.runners.values() {
            accounts.push(runner.scheduler.lock().await.account().clone());
        }
        accounts
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Snapshots
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Follow one account's snapshot stream.
    pub fn subscribe(&self, id: &str) -> Result<watch::Receiver<CodeSnapshot>, OtpError> {
        self.runners
            .get(id)
            .map(|r| r.snapshots.clone())
            .ok_or_else(|| OtpError::AccountNotFound(id.to_string()))
    }

    /// Tick one account right now and return the fresh snapshot
    /// (pull-based access for hosts driving their own cadence).
    pub async fn snapshot(&self, id: &str) -> Result<CodeSnapshot, OtpError> {
        let runner = self
            .runners
            .get(id)
            .ok_or_else(|| OtpError::AccountNotFound(id.to_string()))?;
        Ok(runner.scheduler.lock().await.tick(self.clock.now_unix()))
    }

    /// Tick every account right now. No cross-account ordering is
    /// guaranteed; the streams are independent.
    pub async fn snapshot_all(&self) -> Vec<CodeSnapshot> {
        let now = self.clock.now_unix();
        let mut snaps = Vec::with_capacity(self.runners.len());
        for runner in self.runners.values() {
            snaps.push(runner.scheduler.lock().await.tick(now));
        }
        snaps
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Ticker
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn run_ticker(
        scheduler: Arc<Mutex<AccountScheduler>>,
        tx: watch::Sender<CodeSnapshot>,
        clock: Arc<dyn Clock>,
        every: Duration,
    ) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let snapshot = scheduler.lock().await.tick(clock.now_unix());
            if tx.send(snapshot).is_err() {
                // Runner gone, nobody listening.
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totp::clock::ManualClock;
    use crate::totp::core;

    const RFC4226_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn fast_service(clock: Arc<ManualClock>) -> OtpService {
        OtpService::with_clock(clock).with_tick_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn add_and_snapshot() {
        let clock = ManualClock::new(59);
        let mut svc = fast_service(clock);
        let id = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;

        let snap = svc.snapshot(&id).await.unwrap();
        assert_eq!(snap.display_code(), "287082"); // step 1
        assert_eq!(snap.remaining_seconds, 1);
    }

    #[tokio::test]
    async fn snapshot_follows_the_injected_clock() {
        let clock = ManualClock::new(0);
        let mut svc = fast_service(clock.clone());
        let id = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;

        assert_eq!(svc.snapshot(&id).await.unwrap().display_code(), "755224");
        clock.set(30);
        assert_eq!(svc.snapshot(&id).await.unwrap().display_code(), "287082");
        clock.set(60);
        assert_eq!(svc.snapshot(&id).await.unwrap().display_code(), "359152");
    }

    #[tokio::test]
    async fn accounts_are_independent() {
        let clock = ManualClock::new(59);
        let mut svc = fast_service(clock);
        let good = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;
        let bad = svc.add_account(Account::new("bob", "not base32!!")).await;

        let good_snap = svc.snapshot(&good).await.unwrap();
        let bad_snap = svc.snapshot(&bad).await.unwrap();
        assert!(good_snap.state.is_ready());
        assert_eq!(bad_snap.display_code(), "Error");
        assert_eq!(svc.len(), 2);
    }

    #[tokio::test]
    async fn unknown_account_errors() {
        let svc = OtpService::with_clock(ManualClock::new(0));
        let err = svc.snapshot("nope").await.unwrap_err();
        assert_eq!(err, OtpError::AccountNotFound("nope".into()));
        assert!(svc.subscribe("nope").is_err());
    }

    #[tokio::test]
    async fn remove_account_stops_the_stream() {
        let clock = ManualClock::new(0);
        let mut svc = fast_service(clock);
        let id = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;
        let mut rx = svc.subscribe(&id).unwrap();

        svc.remove_account(&id).unwrap();
        assert!(svc.snapshot(&id).await.is_err());
        assert!(matches!(
            svc.remove_account(&id),
            Err(OtpError::AccountNotFound(_))
        ));

        // The ticker is aborted, so the sender side closes.
        let closed = tokio::time::timeout(Duration::from_secs(1), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok(), "snapshot channel never closed");
    }

    #[tokio::test]
    async fn subscribers_see_code_rotation() {
        let clock = ManualClock::new(29);
        let mut svc = fast_service(clock.clone());
        let id = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;
        let mut rx = svc.subscribe(&id).unwrap();

        assert_eq!(rx.borrow().display_code(), "755224"); // step 0, seeded

        clock.set(30); // next step
        let rotated = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.expect("ticker alive");
                let snap = rx.borrow_and_update().clone();
                if snap.display_code() == "287082" {
                    break snap;
                }
            }
        })
        .await
        .expect("code never rotated");
        assert_eq!(rotated.remaining_seconds, 30);
    }

    #[tokio::test]
    async fn snapshot_all_covers_every_account() {
        let clock = ManualClock::new(59);
        let mut svc = fast_service(clock);
        svc.add_account(Account::new("alice", RFC4226_SECRET)).await;
        svc.add_account(Account::new("carol", "JBSWY3DPEHPK3PXP")).await;

        let snaps = svc.snapshot_all().await;
        assert_eq!(snaps.len(), 2);
        assert!(snaps.iter().all(|s| s.state.is_ready()));
        // Different secrets, same instant, different codes.
        assert_ne!(snaps[0].display_code(), snaps[1].display_code());
    }

    #[tokio::test]
    async fn list_accounts_and_clear() {
        let clock = ManualClock::new(0);
        let mut svc = fast_service(clock);
        svc.add_account(Account::new("alice", RFC4226_SECRET).with_issuer("GitHub"))
            .await;
        let accounts = svc.list_accounts().await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].display_name(), "GitHub (alice)");
        assert_eq!(svc.account_ids(), vec![accounts[0].id.clone()]);

        svc.clear();
        assert!(svc.is_empty());
    }

    #[tokio::test]
    async fn default_service_runs_on_the_system_clock() {
        let state = OtpService::new();
        let mut svc = state.lock().await;
        assert!(svc.is_empty());
        let id = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;
        let snap = svc.snapshot(&id).await.unwrap();
        assert!(snap.state.is_ready());
        assert!((1..=30).contains(&snap.remaining_seconds));
    }

    #[tokio::test]
    async fn snapshots_match_direct_engine_output() {
        let now = 1_234_567_890;
        let clock = ManualClock::new(now);
        let mut svc = fast_service(clock);
        let id = svc.add_account(Account::new("alice", RFC4226_SECRET)).await;

        let snap = svc.snapshot(&id).await.unwrap();
        let expected =
            core::generate_totp_at(RFC4226_SECRET, 6, 30, Algorithm::Sha1, now).unwrap();
        assert_eq!(snap.display_code(), expected);
    }
}
