//! Honeylog - Credential-Capture Login Honeypot
//!
//! This crate implements a fake login endpoint that always rejects while
//! recording every attempt. Accepted attempts are appended to a plaintext
//! log and a digest-only structured log, counted in rolling hour/day/month
//! windows, and optionally forwarded to an operator. Callers are screened
//! by a static blacklist and a per-caller sliding-window limiter, and the
//! persisted state is snapshotted and pruned on a fixed schedule.

pub mod backup;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod journal;
pub mod notify;
pub mod pipeline;
pub mod stats;
