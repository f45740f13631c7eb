//! Outbound notification of captured attempts.

mod mail;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::NotificationConfig;
use crate::error::Result;
use crate::journal::AttemptRecord;
use crate::stats::StatsSnapshot;

pub use mail::{MailMessage, MailRelayNotifier};

/// A fire-and-forget destination for login events.
///
/// Implementations may be slow or fail; callers run them off the response
/// path and only log the result.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, record: &AttemptRecord, counts: &StatsSnapshot) -> Result<()>;
}

/// Build the configured sink, or `None` when notifications are disabled.
pub fn from_config(config: &NotificationConfig) -> Result<Option<Arc<dyn NotificationSink>>> {
    if !config.enabled {
        info!("Notifications disabled");
        return Ok(None);
    }

    let notifier = MailRelayNotifier::from_config(config)?;
    info!(endpoint = %notifier.endpoint(), "Mail notifications enabled");
    Ok(Some(Arc::new(notifier)))
}
