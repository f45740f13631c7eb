//! Persisted rolling attempt counters.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::window::{RollingCounters, StatsSnapshot};
use crate::clock::Clock;
use crate::error::Result;

/// The Counter Store.
///
/// All access goes through one lock so that "reconcile windows, increment,
/// persist" happens as a unit; concurrent attempts are never lost and the
/// file is never written out of order.
pub struct CounterStore {
    /// In-memory state, authoritative for the life of the process
    state: Mutex<RollingCounters>,
    /// Counters file
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CounterStore {
    /// Open the store, seeding from `path` if it holds valid counters.
    ///
    /// A missing or unparsable file yields zeroed counters.
    pub async fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let counters = match load(&path).await {
            Ok(Some(counters)) => {
                info!(path = %path.display(), "Loaded attempt statistics");
                counters
            }
            Ok(None) => RollingCounters::fresh(clock.now()),
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load statistics, starting from zero"
                );
                RollingCounters::fresh(clock.now())
            }
        };

        Self {
            state: Mutex::new(counters),
            path,
            clock,
        }
    }

    /// Count one accepted attempt and return the post-increment snapshot.
    pub async fn record_attempt(&self) -> StatsSnapshot {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state);
        state.increment();

        if let Err(e) = persist(&self.path, &state).await {
            warn!(path = %self.path.display(), error = %e, "Failed to persist statistics");
        }

        state.snapshot()
    }

    /// Current counts after lazy window resets. Does not increment.
    pub async fn current_counts(&self) -> StatsSnapshot {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state);
        state.snapshot()
    }

    /// Path of the persisted counters file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reconcile(&self, state: &mut RollingCounters) {
        for window in state.reconcile(self.clock.now()) {
            debug!(window = window.as_str(), "Statistics window rolled over");
        }
    }
}

async fn load(path: &Path) -> Result<Option<RollingCounters>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Write to a sibling temp file and rename over the target so readers never
/// see a half-written file.
async fn persist(path: &Path, counters: &RollingCounters) -> Result<()> {
    let json = serde_json::to_string_pretty(counters)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, Utc};

    async fn open_store(dir: &Path, clock: Arc<ManualClock>) -> CounterStore {
        CounterStore::open(dir.join("stats.json"), clock).await
    }

    #[tokio::test]
    async fn test_record_attempt_increments_all_windows() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let store = open_store(dir.path(), clock).await;

        for _ in 0..3 {
            store.record_attempt().await;
        }

        assert_eq!(
            store.current_counts().await,
            StatsSnapshot {
                hour: 3,
                day: 3,
                month: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_current_counts_does_not_increment() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), Arc::new(ManualClock::default())).await;

        store.record_attempt().await;
        store.current_counts().await;
        store.current_counts().await;

        assert_eq!(store.current_counts().await.hour, 1);
    }

    #[tokio::test]
    async fn test_hour_rollover_leaves_other_windows() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let store = open_store(dir.path(), clock.clone()).await;

        store.record_attempt().await;
        store.record_attempt().await;

        clock.advance(Duration::minutes(61));
        assert_eq!(
            store.current_counts().await,
            StatsSnapshot {
                hour: 0,
                day: 2,
                month: 2,
            }
        );

        let after = store.record_attempt().await;
        assert_eq!(
            after,
            StatsSnapshot {
                hour: 1,
                day: 3,
                month: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_day_rollover_resets_day_and_hour() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let store = open_store(dir.path(), clock.clone()).await;

        store.record_attempt().await;
        clock.advance(Duration::hours(25));

        assert_eq!(
            store.current_counts().await,
            StatsSnapshot {
                hour: 0,
                day: 0,
                month: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_month_rollover_leaves_hour_and_day() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let store = open_store(dir.path(), clock.clone()).await;

        store.record_attempt().await;
        clock.advance(Duration::days(30) - Duration::minutes(30));
        store.record_attempt().await;

        // Month window started 30 days and 30 minutes ago; hour and day
        // windows started exactly one hour ago.
        clock.advance(Duration::hours(1));
        let after = store.record_attempt().await;

        assert_eq!(
            after,
            StatsSnapshot {
                hour: 2,
                day: 2,
                month: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_counters_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());

        {
            let store = open_store(dir.path(), clock.clone()).await;
            store.record_attempt().await;
            store.record_attempt().await;
        }

        let reopened = open_store(dir.path(), clock).await;
        assert_eq!(reopened.current_counts().await.month, 2);
    }

    #[tokio::test]
    async fn test_persisted_file_uses_millisecond_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let store = open_store(dir.path(), clock).await;

        store.record_attempt().await;

        let contents = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["day"]["count"], 1);
        assert_eq!(value["day"]["timestamp"], start.timestamp_millis());
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stats.json"), "{ not json").unwrap();

        let store = open_store(dir.path(), Arc::new(ManualClock::default())).await;

        assert_eq!(store.current_counts().await, StatsSnapshot::default());
        assert_eq!(store.record_attempt().await.hour, 1);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("stats.json");
        let store = CounterStore::open(path, Arc::new(ManualClock::default())).await;

        assert_eq!(store.record_attempt().await.hour, 1);
        assert_eq!(store.record_attempt().await.hour, 2);
    }

    #[tokio::test]
    async fn test_concurrent_attempts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(dir.path(), Arc::new(ManualClock::default())).await);

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.record_attempt().await })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(store.current_counts().await.hour, 50);
        let reopened = open_store(dir.path(), Arc::new(ManualClock::default())).await;
        assert_eq!(reopened.current_counts().await.hour, 50);
    }
}
