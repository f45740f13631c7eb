//! Rolling hour/day/month attempt statistics.

mod store;
mod window;

pub use store::CounterStore;
pub use window::{RollingCounters, StatsSnapshot, TimeWindow, WindowCell};
