//! Sliding-window admission limiter keyed by caller identifier.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::clock::Clock;

/// How often fully expired ledgers are evicted, in seconds.
const SWEEP_INTERVAL_SECS: i64 = 60;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The attempt was admitted and recorded in the caller's ledger.
    Allowed {
        /// Attempts left in the current window
        remaining: usize,
    },
    /// The caller is over the limit. Nothing was recorded.
    Denied {
        /// Time until the oldest ledger entry leaves the window
        retry_after: std::time::Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// The Admission Limiter.
///
/// Each caller has a ledger of accepted attempt instants. A ledger entry
/// counts while it is younger than `interval`. Ledgers live in a sharded map
/// so different callers rarely contend.
pub struct AdmissionLimiter {
    ledgers: DashMap<String, VecDeque<DateTime<Utc>>>,
    max_attempts: usize,
    interval: Duration,
    clock: Arc<dyn Clock>,
    last_sweep: Mutex<DateTime<Utc>>,
}

impl AdmissionLimiter {
    pub fn new(max_attempts: usize, interval: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        let interval = Duration::from_std(interval).unwrap_or(Duration::MAX);
        let last_sweep = Mutex::new(clock.now());
        Self {
            ledgers: DashMap::new(),
            max_attempts,
            interval,
            clock,
            last_sweep,
        }
    }

    /// Check `caller` against its window and record the attempt if allowed.
    pub fn admit(&self, caller: &str) -> Admission {
        let now = self.clock.now();
        self.maybe_sweep(now);

        let mut ledger = self.ledgers.entry(caller.to_string()).or_default();
        expire(&mut ledger, now, self.interval);

        if ledger.len() >= self.max_attempts {
            let oldest = ledger.front().copied().unwrap_or(now);
            let retry_after = oldest
                .checked_add_signed(self.interval)
                .map(|until| (until - now).to_std().unwrap_or_default())
                .unwrap_or(std::time::Duration::MAX);
            debug!(
                caller = %caller,
                attempts = ledger.len(),
                retry_after_secs = retry_after.as_secs(),
                "Admission limit exceeded"
            );
            return Admission::Denied { retry_after };
        }

        ledger.push_back(now);
        trace!(caller = %caller, attempts = ledger.len(), "Attempt admitted");

        Admission::Allowed {
            remaining: self.max_attempts - ledger.len(),
        }
    }

    /// Number of callers with a ledger in memory.
    pub fn tracked_callers(&self) -> usize {
        self.ledgers.len()
    }

    /// Drop ledgers whose every entry has expired.
    pub fn evict_expired(&self) {
        let now = self.clock.now();
        let before = self.ledgers.len();
        self.ledgers.retain(|_, ledger| {
            expire(ledger, now, self.interval);
            !ledger.is_empty()
        });
        let evicted = before.saturating_sub(self.ledgers.len());
        if evicted > 0 {
            debug!(evicted, "Evicted expired admission ledgers");
        }
    }

    fn maybe_sweep(&self, now: DateTime<Utc>) {
        {
            let mut last_sweep = self.last_sweep.lock();
            if now - *last_sweep < Duration::seconds(SWEEP_INTERVAL_SECS) {
                return;
            }
            *last_sweep = now;
        }
        self.evict_expired();
    }
}

fn expire(ledger: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) {
    while let Some(oldest) = ledger.front() {
        if now - *oldest >= interval {
            ledger.pop_front();
        } else {
            break;
        }
    }
}
