//! Request admission: caller identity, blacklist and throttling.

mod blacklist;
mod identity;
mod limiter;

pub use blacklist::BlacklistGuard;
pub use identity::{resolve_caller, FORWARDED_FOR};
pub use limiter::{Admission, AdmissionLimiter};
