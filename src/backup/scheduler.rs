//! Periodic snapshots of the persisted files with age-based retention.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::HoneylogConfig;
use crate::error::Result;

/// Timestamp suffix format: colons replaced, sub-second precision dropped.
const SUFFIX_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Time between snapshots.
pub const BACKUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Copies last modified longer ago than this are pruned.
pub const RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// The Backup Scheduler.
///
/// Only touches the filesystem: it reads the source files and owns the
/// copies it writes to the backup directory.
pub struct BackupScheduler {
    sources: Vec<PathBuf>,
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl BackupScheduler {
    pub fn new(sources: Vec<PathBuf>, dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sources,
            dir: dir.into(),
            clock,
        }
    }

    /// Back up the counters file and both attempt logs.
    pub fn from_config(config: &HoneylogConfig, clock: Arc<dyn Clock>) -> Self {
        let sources = vec![
            config.storage.stats_file.clone(),
            config.storage.plaintext_log.clone(),
            config.storage.structured_log.clone(),
        ];
        Self::new(sources, config.backup.dir.clone(), clock)
    }

    /// Run forever: prune and snapshot now, then once per [`BACKUP_INTERVAL`].
    pub async fn run(self) {
        info!(
            dir = %self.dir.display(),
            interval_secs = BACKUP_INTERVAL.as_secs(),
            retention_days = RETENTION.as_secs() / 86400,
            "Starting backup scheduler"
        );

        loop {
            self.prune_expired().await;

            match self.snapshot().await {
                Ok(copies) => info!(copies = copies.len(), "Backup completed"),
                Err(e) => error!(dir = %self.dir.display(), error = %e, "Backup failed"),
            }

            tokio::time::sleep(BACKUP_INTERVAL).await;
        }
    }

    /// Copy every existing source into the backup directory.
    ///
    /// Missing sources are skipped. A failure on one source is logged and
    /// does not stop the others. Returns the paths of the copies written.
    pub async fn snapshot(&self) -> Result<Vec<PathBuf>> {
        let suffix = self.clock.now().format(SUFFIX_FORMAT).to_string();

        let existing: Vec<&PathBuf> = join_all(self.sources.iter().map(|source| async move {
            tokio::fs::try_exists(source).await.unwrap_or(false).then_some(source)
        }))
        .await
        .into_iter()
        .flatten()
        .collect();

        if existing.is_empty() {
            debug!("No backup sources present");
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let copies = join_all(existing.into_iter().map(|source| {
            let target = self.dir.join(backup_name(source, &suffix));
            async move {
                match tokio::fs::copy(source, &target).await {
                    Ok(_) => {
                        debug!(
                            source = %source.display(),
                            target = %target.display(),
                            "Backed up file"
                        );
                        Some(target)
                    }
                    Err(e) => {
                        warn!(source = %source.display(), error = %e, "Failed to back up file");
                        None
                    }
                }
            }
        }))
        .await;

        Ok(copies.into_iter().flatten().collect())
    }

    /// Delete backup entries last modified more than [`RETENTION`] ago.
    /// Entries that cannot be inspected or deleted are skipped. Returns the
    /// number of entries deleted.
    pub async fn prune_expired(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to read backup directory");
                return 0;
            }
        };

        let Some(cutoff) = SystemTime::from(self.clock.now()).checked_sub(RETENTION) else {
            return 0;
        };
        let mut deleted = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Failed to read backup entry");
                    break;
                }
            };
            let path = entry.path();

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to inspect backup");
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!(
                        path = %path.display(),
                        modified = %DateTime::<Utc>::from(modified),
                        "Deleted expired backup"
                    );
                    deleted += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete backup"),
            }
        }

        deleted
    }
}

/// `<stem>_<suffix>.<ext>`, or `<name>_<suffix>` when there is no extension.
fn backup_name(source: &Path, suffix: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    match source.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    }
}
