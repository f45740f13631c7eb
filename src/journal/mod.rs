//! Attempt records and the durable attempt logs.

mod digest;
mod logger;
mod record;

pub use digest::SecretDigest;
pub use logger::DurableLogger;
pub use record::{AttemptRecord, StructuredEntry};
