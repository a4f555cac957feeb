//! Failed-login throttling.
//!
//! Sliding window over failed login attempts per account. An attempt must
//! reserve a slot before the password hasher runs; failures inside `window`
//! plus attempts still in flight may never exceed `max_attempts`. Once the
//! limit is reached further attempts are refused until the oldest failure
//! ages out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct AccountState {
    /// Failure timestamps inside the window
    failures: Vec<Instant>,
    /// Reserved attempts whose outcome is not known yet
    in_flight: usize,
}

impl AccountState {
    fn prune(&mut self, now: Instant, window: Duration) {
        self.failures.retain(|&t| now.duration_since(t) < window);
    }

    fn is_idle(&self) -> bool {
        self.failures.is_empty() && self.in_flight == 0
    }
}

/// Per-account failed login counter.
pub struct LoginThrottle {
    accounts: Mutex<HashMap<String, AccountState>>,
    /// Failures allowed per window
    max_attempts: usize,
    /// Sliding window length
    window: Duration,
}

impl LoginThrottle {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Reserve an attempt for `account`, or `None` if the account is
    /// throttled.
    ///
    /// The check and the reservation happen under one lock, so concurrent
    /// attempts cannot overshoot the limit. The returned [`LoginAttempt`] must
    /// be settled with [`LoginAttempt::failed`] or [`LoginAttempt::succeeded`];
    /// dropping it unsettled just releases the slot.
    pub fn try_acquire(&self, account: &str) -> Option<LoginAttempt<'_>> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let state = accounts.entry(account.to_string()).or_default();
        state.prune(now, self.window);

        if state.failures.len() + state.in_flight >= self.max_attempts {
            if state.is_idle() {
                accounts.remove(account);
            }
            return None;
        }

        state.in_flight += 1;
        Some(LoginAttempt {
            throttle: self,
            account: account.to_string(),
            settled: false,
        })
    }

    /// Whether a new attempt for `account` would currently be admitted.
    pub fn is_allowed(&self, account: &str) -> bool {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match accounts.get(account) {
            Some(state) => {
                let recent = state
                    .failures
                    .iter()
                    .filter(|&&t| now.duration_since(t) < self.window)
                    .count();
                recent + state.in_flight < self.max_attempts
            }
            None => true,
        }
    }

    /// Close out one reservation for `account`.
    fn settle(&self, account: &str, outcome: Outcome) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let Some(state) = accounts.get_mut(account) else {
            return;
        };
        state.in_flight = state.in_flight.saturating_sub(1);
        match outcome {
            Outcome::Failed => {
                state.prune(now, self.window);
                state.failures.push(now);
            }
            Outcome::Succeeded => state.failures.clear(),
            Outcome::Released => {}
        }
        if state.is_idle() {
            accounts.remove(account);
        }
    }

    /// Drop accounts whose failures have all aged out and that have nothing
    /// in flight.
    pub fn cleanup(&self) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        accounts.retain(|_, state| {
            state.prune(now, self.window);
            !state.is_idle()
        });
    }

    /// Number of accounts with recent failures or attempts in flight.
    pub fn tracked_accounts(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Start a background cleanup task.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let throttle = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                throttle.cleanup();
            }
        });
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Failed,
    Succeeded,
    Released,
}

/// A reserved login attempt.
#[must_use = "an unsettled attempt is released without counting as a failure"]
pub struct LoginAttempt<'a> {
    throttle: &'a LoginThrottle,
    account: String,
    settled: bool,
}

impl LoginAttempt<'_> {
    /// The password did not match: count a failure.
    pub fn failed(mut self) {
        self.settled = true;
        self.throttle.settle(&self.account, Outcome::Failed);
    }

    /// The password matched: forget the account's failures.
    pub fn succeeded(mut self) {
        self.settled = true;
        self.throttle.settle(&self.account, Outcome::Succeeded);
    }
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.throttle.settle(&self.account, Outcome::Released);
        }
    }
}
