//! One-way digest for submitted secrets.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Keyed one-way transform applied to secrets before they reach the
/// structured log. Never used for comparison.
#[derive(Clone)]
pub struct SecretDigest {
    key: Vec<u8>,
}

impl SecretDigest {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    /// Hex-encoded HMAC-SHA256 of `secret`.
    pub fn digest(&self, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(secret.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretDigest").finish_non_exhaustive()
    }
}
