//! A captured login attempt.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::digest::SecretDigest;

/// One honeypot submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    /// Caller identifier the request was admitted under
    pub caller: String,
    /// Submitted user name, as received
    pub name: String,
    /// Submitted secret, as received. Only for the plaintext log and
    /// operator notifications.
    pub secret: String,
    /// One-way digest of `secret`, the only form written to the structured log
    pub secret_digest: String,
}

/// Structured log entry. Carries the digest, never the secret.
#[derive(Debug, Serialize)]
pub struct StructuredEntry<'a> {
    pub timestamp: String,
    pub ip: &'a str,
    pub name: &'a str,
    pub kennwort_hash: &'a str,
}

impl AttemptRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        caller: impl Into<String>,
        name: impl Into<String>,
        secret: impl Into<String>,
        digest: &SecretDigest,
    ) -> Self {
        let secret = secret.into();
        let secret_digest = digest.digest(&secret);
        Self {
            timestamp,
            caller: caller.into(),
            name: name.into(),
            secret,
            secret_digest,
        }
    }

    /// ISO-8601 timestamp with millisecond precision, e.g.
    /// `2024-05-01T12:00:00.000Z`.
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// The plaintext log line, newline-terminated. Submitted fields are
    /// written exactly as received.
    pub fn plaintext_line(&self) -> String {
        format!(
            "[{}] IP: {} | Name: {} | Kennwort: {}\n",
            self.iso_timestamp(),
            self.caller,
            self.name,
            self.secret,
        )
    }

    pub fn structured_entry(&self) -> StructuredEntry<'_> {
        StructuredEntry {
            timestamp: self.iso_timestamp(),
            ip: &self.caller,
            name: &self.name,
            kennwort_hash: &self.secret_digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, secret: &str) -> AttemptRecord {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        AttemptRecord::new(timestamp, "1.2.3.4", name, secret, &SecretDigest::new("key"))
    }

    #[test]
    fn test_plaintext_line_format() {
        let line = record("admin", "1234").plaintext_line();
        assert_eq!(
            line,
            "[2024-05-01T12:00:00.000Z] IP: 1.2.3.4 | Name: admin | Kennwort: 1234\n"
        );
    }

    #[test]
    fn test_plaintext_line_keeps_secret_verbatim() {
        let with_break = record("admin", "pw\nx").plaintext_line();
        let with_backslash = record("admin", "pw\\nx").plaintext_line();

        assert!(with_break.ends_with("Kennwort: pw\nx\n"));
        assert!(with_backslash.ends_with("Kennwort: pw\\nx\n"));
        assert_ne!(with_break, with_backslash);
    }

    #[test]
    fn test_structured_entry_has_digest_only() {
        let record = record("admin", "s3cret-value");
        let json = serde_json::to_string(&record.structured_entry()).unwrap();

        assert!(!json.contains("s3cret-value"));
        assert!(json.contains(&record.secret_digest));
        assert!(json.contains(r#""ip":"1.2.3.4""#));
        assert!(json.contains(r#""timestamp":"2024-05-01T12:00:00.000Z""#));
    }
}
