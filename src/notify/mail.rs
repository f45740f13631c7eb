//! Mail relay notifier.
//!
//! Posts a JSON mail message to an HTTP mail relay (the transport endpoint
//! from configuration) using basic auth when credentials are set.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::NotificationSink;
use crate::config::NotificationConfig;
use crate::error::{HoneylogError, Result};
use crate::journal::AttemptRecord;
use crate::stats::StatsSnapshot;

const DEFAULT_SENDER: &str = "honeylog@localhost";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message body sent to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

pub struct MailRelayNotifier {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    sender: String,
    recipient: String,
}

impl MailRelayNotifier {
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| HoneylogError::Config("notifications.endpoint is required".into()))?;
        let recipient = config
            .recipient
            .clone()
            .ok_or_else(|| HoneylogError::Config("notifications.recipient is required".into()))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HoneylogError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            username: config.username.clone(),
            password: config.password.clone(),
            sender: config
                .sender
                .clone()
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            recipient,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Compose the operator mail for one attempt.
    pub fn compose(&self, record: &AttemptRecord, counts: &StatsSnapshot) -> MailMessage {
        let text = format!(
            "Zeit: {}\nIP: {}\nName: {}\nKennwort: {}\n\n\
             Versuche letzte Stunde: {}\n\
             Versuche letzter Tag: {}\n\
             Versuche letzter Monat: {}\n",
            record.iso_timestamp(),
            record.caller,
            record.name,
            record.secret,
            counts.hour,
            counts.day,
            counts.month,
        );

        MailMessage {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            subject: format!("Neuer Login-Versuch von {}", record.caller),
            text,
        }
    }
}

#[async_trait]
impl NotificationSink for MailRelayNotifier {
    async fn send(&self, record: &AttemptRecord, counts: &StatsSnapshot) -> Result<()> {
        let message = self.compose(record, counts);

        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| HoneylogError::Notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HoneylogError::Notify(format!("Mail relay responded with {}", status)));
        }

        debug!(caller = %record.caller, "Notification delivered");
        Ok(())
    }
}
