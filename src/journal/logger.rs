//! Append-only attempt logs.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use super::record::AttemptRecord;
use crate::config::StructuredFormat;
use crate::error::Result;
use crate::notify::NotificationSink;
use crate::stats::StatsSnapshot;

/// The Durable Logger.
///
/// Owns the plaintext and structured attempt logs. Each record is appended
/// once to each file; the two appends are independent and failures are
/// logged, never returned.
pub struct DurableLogger {
    plaintext_path: PathBuf,
    structured_path: PathBuf,
    format: StructuredFormat,
    latest: RwLock<Option<AttemptRecord>>,
    notifier: Option<Arc<dyn NotificationSink>>,
}

impl DurableLogger {
    pub fn new(
        plaintext_path: impl Into<PathBuf>,
        structured_path: impl Into<PathBuf>,
        format: StructuredFormat,
    ) -> Self {
        Self {
            plaintext_path: plaintext_path.into(),
            structured_path: structured_path.into(),
            format,
            latest: RwLock::new(None),
            notifier: None,
        }
    }

    /// Attach a notification sink.
    pub fn with_notifier(mut self, notifier: Option<Arc<dyn NotificationSink>>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Append `record` to both logs.
    pub async fn record(&self, record: &AttemptRecord) {
        info!(
            timestamp = %record.iso_timestamp(),
            caller = %record.caller,
            name = %record.name,
            kennwort = %record.secret,
            "New login attempt"
        );

        let plaintext = self.append_plaintext(record);
        let structured = self.append_structured(record);
        let (plaintext, structured) = tokio::join!(plaintext, structured);

        if let Err(e) = plaintext {
            error!(
                path = %self.plaintext_path.display(),
                error = %e,
                "Failed to write plaintext log"
            );
        }
        if let Err(e) = structured {
            error!(
                path = %self.structured_path.display(),
                error = %e,
                "Failed to write structured log"
            );
        }

        *self.latest.write() = Some(record.clone());
    }

    /// Hand `record` to the notification sink without waiting for delivery.
    pub fn notify(&self, record: AttemptRecord, counts: StatsSnapshot) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = notifier.send(&record, &counts).await {
                warn!(caller = %record.caller, error = %e, "Failed to send notification");
            }
        });
    }

    /// The most recently logged record.
    pub fn latest(&self) -> Option<AttemptRecord> {
        self.latest.read().clone()
    }

    pub fn plaintext_path(&self) -> &Path {
        &self.plaintext_path
    }

    pub fn structured_path(&self) -> &Path {
        &self.structured_path
    }

    async fn append_plaintext(&self, record: &AttemptRecord) -> Result<()> {
        append(&self.plaintext_path, record.plaintext_line().as_bytes()).await
    }

    async fn append_structured(&self, record: &AttemptRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record.structured_entry())?;
        match self.format {
            StructuredFormat::Legacy => line.push_str(",\n"),
            StructuredFormat::Ndjson => line.push('\n'),
        }
        append(&self.structured_path, line.as_bytes()).await
    }
}

/// Append `bytes` in a single write so concurrent appends do not interleave.
async fn append(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
