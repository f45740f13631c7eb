//! The login request pipeline.
//!
//! Blacklist, then admission limiter, then capture (log, count, notify).
//! Every accepted attempt is rejected: there are no real credentials.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::config::HoneylogConfig;
use crate::error::Result;
use crate::guard::{Admission, AdmissionLimiter, BlacklistGuard};
use crate::journal::{AttemptRecord, DurableLogger, SecretDigest};
use crate::notify;
use crate::stats::{CounterStore, StatsSnapshot};

/// A login form submission.
#[derive(Debug, Clone, Default)]
pub struct LoginSubmission {
    pub name: String,
    pub secret: String,
}

/// Terminal outcome of a login request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Caller is blacklisted. Nothing was logged or counted.
    Blocked,
    /// Caller is over its admission limit. Nothing was logged or counted.
    Throttled { message: String, retry_after: Duration },
    /// Attempt was captured and, as always, rejected.
    Rejected { message: String, stats: StatsSnapshot },
}

/// Response messages shown to callers.
#[derive(Debug, Clone)]
pub struct Messages {
    pub wrong_credentials: String,
    pub throttled: String,
}

/// The Request Pipeline.
pub struct LoginPipeline {
    blacklist: BlacklistGuard,
    limiter: AdmissionLimiter,
    logger: DurableLogger,
    counters: CounterStore,
    digest: SecretDigest,
    messages: Messages,
    clock: Arc<dyn Clock>,
}

impl LoginPipeline {
    pub fn new(
        blacklist: BlacklistGuard,
        limiter: AdmissionLimiter,
        logger: DurableLogger,
        counters: CounterStore,
        digest: SecretDigest,
        messages: Messages,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            blacklist,
            limiter,
            logger,
            counters,
            digest,
            messages,
            clock,
        }
    }

    /// Assemble the pipeline and its components from configuration.
    pub async fn from_config(config: &HoneylogConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let blacklist = BlacklistGuard::load(&config.storage.blacklist_file);
        let limiter = AdmissionLimiter::new(
            config.rate_limiting.max_attempts,
            config.rate_limiting.interval(),
            clock.clone(),
        );
        let logger = DurableLogger::new(
            &config.storage.plaintext_log,
            &config.storage.structured_log,
            config.storage.structured_format,
        )
        .with_notifier(notify::from_config(&config.notifications)?);
        let counters = CounterStore::open(&config.storage.stats_file, clock.clone()).await;

        Ok(Self::new(
            blacklist,
            limiter,
            logger,
            counters,
            SecretDigest::new(&config.storage.digest_key),
            Messages {
                wrong_credentials: config.messages.wrong_credentials.clone(),
                throttled: config.messages.throttled.clone(),
            },
            clock,
        ))
    }

    /// Handle one login submission from `caller`.
    ///
    /// Capture runs on its own task so it completes even if the client
    /// disconnects and this future is dropped.
    #[instrument(skip_all, fields(caller = %caller))]
    pub async fn submit(
        self: &Arc<Self>,
        caller: String,
        submission: LoginSubmission,
    ) -> LoginOutcome {
        if self.blacklist.is_blocked(&caller) {
            info!("Blacklisted caller denied");
            return LoginOutcome::Blocked;
        }

        if let Admission::Denied { retry_after } = self.limiter.admit(&caller) {
            warn!(retry_after_secs = retry_after.as_secs(), "Caller throttled");
            return LoginOutcome::Throttled {
                message: self.messages.throttled.clone(),
                retry_after,
            };
        }

        let pipeline = Arc::clone(self);
        let capture = tokio::spawn(async move { pipeline.capture(caller, submission).await });

        let stats = match capture.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Attempt capture task failed");
                self.counters.current_counts().await
            }
        };

        LoginOutcome::Rejected {
            message: self.messages.wrong_credentials.clone(),
            stats,
        }
    }

    /// Current statistics. Touches nothing but the Counter Store.
    pub async fn stats(&self) -> StatsSnapshot {
        self.counters.current_counts().await
    }

    pub fn logger(&self) -> &DurableLogger {
        &self.logger
    }

    async fn capture(&self, caller: String, submission: LoginSubmission) -> StatsSnapshot {
        let record = AttemptRecord::new(
            self.clock.now(),
            caller,
            submission.name,
            submission.secret,
            &self.digest,
        );

        self.logger.record(&record).await;
        let stats = self.counters.record_attempt().await;
        debug!(hour = stats.hour, day = stats.day, month = stats.month, "Attempt counted");

        self.logger.notify(record, stats);
        stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StructuredFormat;
    use std::path::Path;

    pub(crate) async fn test_pipeline(
        dir: &Path,
        clock: Arc<ManualClock>,
        blacklist: &[&str],
    ) -> Arc<LoginPipeline> {
        let pipeline = LoginPipeline::new(
            blacklist.iter().copied().collect(),
            AdmissionLimiter::new(5, Duration::from_secs(15 * 60), clock.clone()),
            DurableLogger::new(
                dir.join("login_log.txt"),
                dir.join("login_log.json"),
                StructuredFormat::Legacy,
            ),
            CounterStore::open(dir.join("stats.json"), clock.clone()).await,
            SecretDigest::new("test-key"),
            Messages {
                wrong_credentials: "Benutzername oder Passwort falsch".to_string(),
                throttled: "Zu viele Anmeldeversuche".to_string(),
            },
            clock,
        );
        Arc::new(pipeline)
    }

    fn submission(name: &str, secret: &str) -> LoginSubmission {
        LoginSubmission {
            name: name.to_string(),
            secret: secret.to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_attempt_is_rejected_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path(), Arc::new(ManualClock::default()), &[]).await;

        let outcome = pipeline
            .submit("1.2.3.4".to_string(), submission("admin", "1234"))
            .await;

        assert_eq!(
            outcome,
            LoginOutcome::Rejected {
                message: "Benutzername oder Passwort falsch".to_string(),
                stats: StatsSnapshot {
                    hour: 1,
                    day: 1,
                    month: 1,
                },
            }
        );
        assert_eq!(pipeline.stats().await.month, 1);

        let latest = pipeline.logger().latest().unwrap();
        assert_eq!(latest.caller, "1.2.3.4");
        assert_eq!(latest.name, "admin");
    }

    #[tokio::test]
    async fn test_blacklisted_caller_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline =
            test_pipeline(dir.path(), Arc::new(ManualClock::default()), &["6.6.6.6"]).await;

        for _ in 0..10 {
            let outcome = pipeline
                .submit("6.6.6.6".to_string(), submission("root", "toor"))
                .await;
            assert_eq!(outcome, LoginOutcome::Blocked);
        }

        assert_eq!(pipeline.stats().await, StatsSnapshot::default());
        assert!(pipeline.logger().latest().is_none());
        assert!(!dir.path().join("login_log.txt").exists());
        assert!(!dir.path().join("login_log.json").exists());
    }

    #[tokio::test]
    async fn test_sixth_attempt_is_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path(), Arc::new(ManualClock::default()), &[]).await;

        for _ in 0..5 {
            let outcome = pipeline
                .submit("1.2.3.4".to_string(), submission("admin", "pw"))
                .await;
            assert!(matches!(outcome, LoginOutcome::Rejected { .. }));
        }

        let outcome = pipeline
            .submit("1.2.3.4".to_string(), submission("admin", "pw"))
            .await;

        assert!(matches!(outcome, LoginOutcome::Throttled { .. }));
        assert_eq!(pipeline.stats().await.hour, 5);
        let plaintext = std::fs::read_to_string(dir.path().join("login_log.txt")).unwrap();
        assert_eq!(plaintext.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_throttled_caller_admitted_after_interval() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let pipeline = test_pipeline(dir.path(), clock.clone(), &[]).await;

        for _ in 0..6 {
            pipeline
                .submit("1.2.3.4".to_string(), submission("admin", "pw"))
                .await;
        }

        clock.advance(chrono::Duration::minutes(15));
        let outcome = pipeline
            .submit("1.2.3.4".to_string(), submission("admin", "pw"))
            .await;

        match outcome {
            LoginOutcome::Rejected { stats, .. } => assert_eq!(stats.hour, 6),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_attempts_from_distinct_callers() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path(), Arc::new(ManualClock::default()), &[]).await;

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    pipeline
                        .submit(format!("10.0.0.{}", i), submission("admin", "pw"))
                        .await
                })
            })
            .collect();
        for outcome in futures::future::join_all(tasks).await {
            assert!(matches!(outcome.unwrap(), LoginOutcome::Rejected { .. }));
        }

        assert_eq!(pipeline.stats().await.hour, 50);
        let structured = std::fs::read_to_string(dir.path().join("login_log.json")).unwrap();
        assert_eq!(structured.lines().count(), 50);
    }

    #[tokio::test]
    async fn test_capture_completes_after_caller_goes_away() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path(), Arc::new(ManualClock::default()), &[]).await;

        let submit = pipeline.submit("1.2.3.4".to_string(), submission("admin", "gone"));
        let mut request = Box::pin(submit);
        assert!(futures::poll!(request.as_mut()).is_pending());
        drop(request);

        for _ in 0..200 {
            if pipeline.stats().await.hour == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(pipeline.stats().await.month, 1);
        let plaintext = std::fs::read_to_string(dir.path().join("login_log.txt")).unwrap();
        assert!(plaintext.contains("IP: 1.2.3.4 | Name: admin | Kennwort: gone"));
        assert_eq!(pipeline.logger().latest().unwrap().secret, "gone");
    }

    #[tokio::test]
    async fn test_structured_log_never_holds_secret() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path(), Arc::new(ManualClock::default()), &[]).await;

        for (i, secret) in ["correct horse", "Tr0ub4dor&3", "pässwort"].iter().enumerate() {
            pipeline
                .submit(format!("10.0.0.{}", i), submission("admin", secret))
                .await;
        }

        let plaintext = std::fs::read_to_string(dir.path().join("login_log.txt")).unwrap();
        let structured = std::fs::read_to_string(dir.path().join("login_log.json")).unwrap();
        for secret in ["correct horse", "Tr0ub4dor&3", "pässwort"] {
            assert!(plaintext.contains(secret));
            assert!(!structured.contains(secret));
        }
    }
}
