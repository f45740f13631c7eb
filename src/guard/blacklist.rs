//! Static caller blacklist.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;

/// On-disk layout: `{"ips": ["1.2.3.4", ...]}`.
#[derive(Debug, Default, Deserialize)]
struct BlacklistFile {
    #[serde(default)]
    ips: Vec<String>,
}

/// Read-only set of denied caller identifiers, loaded once at startup.
#[derive(Debug, Default, Clone)]
pub struct BlacklistGuard {
    denied: HashSet<String>,
}

impl BlacklistGuard {
    /// Load the blacklist from `path`.
    ///
    /// A missing or unparsable file yields an empty set.
    pub fn load(path: &Path) -> Self {
        match read(path) {
            Ok(Some(guard)) => {
                info!(path = %path.display(), entries = guard.len(), "Loaded blacklist");
                guard
            }
            Ok(None) => {
                info!(
                    path = %path.display(),
                    "No blacklist file, starting with empty blacklist"
                );
                Self::default()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load blacklist, starting with empty blacklist"
                );
                Self::default()
            }
        }
    }

    pub fn is_blocked(&self, caller: &str) -> bool {
        self.denied.contains(caller)
    }

    pub fn len(&self) -> usize {
        self.denied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.denied.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for BlacklistGuard {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            denied: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn read(path: &Path) -> Result<Option<BlacklistGuard>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file: BlacklistFile = serde_json::from_str(&contents)?;
    Ok(Some(file.ips.into_iter().collect()))
}
