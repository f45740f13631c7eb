//! Configuration management for Honeylog.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{HoneylogError, Result};

/// Prefix for environment overrides, e.g. `HONEYLOG__SERVER__LISTEN_ADDR`.
const ENV_PREFIX: &str = "HONEYLOG";

/// Longest accepted admission window, in seconds (one year).
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Main configuration for the Honeylog service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoneylogConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Persisted file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Admission limiter configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Backup scheduler configuration
    #[serde(default)]
    pub backup: BackupConfig,

    /// Outbound notification configuration
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Localized response messages
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Directory served for any path that is not an API route. Must not
    /// contain any file the service writes or reads secrets from.
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<PathBuf>,

    /// Take the caller identifier from `X-Forwarded-For` when present.
    /// Only safe behind a reverse proxy that overwrites the header.
    #[serde(default = "default_true")]
    pub trust_forwarded_header: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            static_dir: default_static_dir(),
            trust_forwarded_header: true,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_static_dir() -> Option<PathBuf> {
    Some(PathBuf::from("public"))
}

fn default_true() -> bool {
    true
}

/// Layout of the structured attempt log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuredFormat {
    /// One JSON object followed by `,\n` per attempt. Not a valid JSON
    /// document as a whole; kept for compatibility with existing tooling.
    #[default]
    Legacy,
    /// Newline-delimited JSON.
    Ndjson,
}

/// Persisted file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_stats_file")]
    pub stats_file: PathBuf,

    #[serde(default = "default_blacklist_file")]
    pub blacklist_file: PathBuf,

    /// Human-readable attempt log (contains clear-text secrets)
    #[serde(default = "default_plaintext_log")]
    pub plaintext_log: PathBuf,

    /// Machine-readable attempt log (digests only)
    #[serde(default = "default_structured_log")]
    pub structured_log: PathBuf,

    #[serde(default)]
    pub structured_format: StructuredFormat,

    /// Key for the one-way secret digest
    #[serde(default = "default_digest_key")]
    pub digest_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            stats_file: default_stats_file(),
            blacklist_file: default_blacklist_file(),
            plaintext_log: default_plaintext_log(),
            structured_log: default_structured_log(),
            structured_format: StructuredFormat::default(),
            digest_key: default_digest_key(),
        }
    }
}

fn default_stats_file() -> PathBuf {
    PathBuf::from("stats.json")
}

fn default_blacklist_file() -> PathBuf {
    PathBuf::from("blacklist.json")
}

fn default_plaintext_log() -> PathBuf {
    PathBuf::from("login_log.txt")
}

fn default_structured_log() -> PathBuf {
    PathBuf::from("login_log.json")
}

fn default_digest_key() -> String {
    "honeylog".to_string()
}

/// Admission limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Accepted attempts per caller within one interval
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Sliding window length in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl RateLimitingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_max_attempts() -> usize {
    5
}

fn default_interval_secs() -> u64 {
    15 * 60
}

/// Backup scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_backup_dir(),
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

/// Outbound notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Mail relay endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub sender: Option<String>,

    #[serde(default)]
    pub recipient: Option<String>,
}

/// Localized response messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_wrong_credentials")]
    pub wrong_credentials: String,

    #[serde(default = "default_throttled")]
    pub throttled: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            wrong_credentials: default_wrong_credentials(),
            throttled: default_throttled(),
        }
    }
}

fn default_wrong_credentials() -> String {
    "Benutzername oder Passwort falsch".to_string()
}

fn default_throttled() -> String {
    "Zu viele Anmeldeversuche. Bitte versuchen Sie es in 15 Minuten erneut.".to_string()
}

impl HoneylogConfig {
    /// Load configuration from an optional YAML file layered under
    /// `HONEYLOG__*` environment variables, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate(path)?;
        Ok(config)
    }

    /// Reject limiter settings that cannot be enforced and a static
    /// directory that would expose persisted files. `config_path` is the
    /// file the configuration was read from, if any.
    pub fn validate(&self, config_path: Option<&Path>) -> Result<()> {
        let limits = &self.rate_limiting;
        if limits.max_attempts == 0 {
            return Err(HoneylogError::Config(
                "rate_limiting.max_attempts must be at least 1".to_string(),
            ));
        }
        if limits.interval_secs == 0 || limits.interval_secs > MAX_INTERVAL_SECS {
            return Err(HoneylogError::Config(format!(
                "rate_limiting.interval_secs must be between 1 and {}, got {}",
                MAX_INTERVAL_SECS, limits.interval_secs
            )));
        }

        if let Some(static_dir) = &self.server.static_dir {
            let root = normalize(static_dir);
            let owned = [
                &self.storage.stats_file,
                &self.storage.blacklist_file,
                &self.storage.plaintext_log,
                &self.storage.structured_log,
                &self.backup.dir,
            ];
            let exposed = owned
                .into_iter()
                .map(PathBuf::as_path)
                .chain(config_path)
                .find(|path| normalize(path).starts_with(&root));
            if let Some(path) = exposed {
                return Err(HoneylogError::Config(format!(
                    "server.static_dir {} would serve {}",
                    static_dir.display(),
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

/// Absolute, lexically normalized form of `path`.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
