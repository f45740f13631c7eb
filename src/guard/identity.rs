//! Caller identifier resolution.
//!
//! The same identifier keys the blacklist, the admission limiter and the
//! attempt logs, so it is resolved once per request.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Header carrying the original client address when behind a proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifier used when neither a header nor a peer address is available.
const UNKNOWN_CALLER: &str = "unknown";

/// Resolve the caller identifier for a request.
///
/// Precedence: the first entry of `X-Forwarded-For` when trusted and
/// non-empty, otherwise the transport peer's IP address.
pub fn resolve_caller(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_header: bool,
) -> String {
    if trust_forwarded_header {
        if let Some(forwarded) = forwarded_for(headers) {
            return forwarded;
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}
