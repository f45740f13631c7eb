//! Scheduled backup and retention of persisted state.

mod scheduler;

pub use scheduler::BackupScheduler;
