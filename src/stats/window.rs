//! Rolling window cells.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window kind for attempt statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    /// Rolling hour
    Hour,
    /// Rolling day
    Day,
    /// Rolling 30-day month
    Month,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [TimeWindow::Hour, TimeWindow::Day, TimeWindow::Month];

    /// Get the length of this time window.
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::Hour => Duration::hours(1),
            TimeWindow::Day => Duration::hours(24),
            TimeWindow::Month => Duration::days(30),
        }
    }

    /// Field name used in the persisted file and the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Month => "month",
        }
    }
}

/// A single `{count, timestamp}` cell. The timestamp is the window start,
/// stored as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCell {
    pub count: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl WindowCell {
    /// An empty cell whose window starts at `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            timestamp: now,
        }
    }

    /// Reset the cell if more than one window length has passed since it
    /// started. Returns `true` if it was reset.
    pub fn reconcile(&mut self, window: TimeWindow, now: DateTime<Utc>) -> bool {
        if now - self.timestamp > window.duration() {
            *self = Self::fresh(now);
            true
        } else {
            false
        }
    }
}

/// The three independent cells, in the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingCounters {
    pub hour: WindowCell,
    pub day: WindowCell,
    pub month: WindowCell,
}

impl RollingCounters {
    /// Zeroed counters with every window starting at `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            hour: WindowCell::fresh(now),
            day: WindowCell::fresh(now),
            month: WindowCell::fresh(now),
        }
    }

    pub fn cell(&self, window: TimeWindow) -> &WindowCell {
        match window {
            TimeWindow::Hour => &self.hour,
            TimeWindow::Day => &self.day,
            TimeWindow::Month => &self.month,
        }
    }

    pub fn cell_mut(&mut self, window: TimeWindow) -> &mut WindowCell {
        match window {
            TimeWindow::Hour => &mut self.hour,
            TimeWindow::Day => &mut self.day,
            TimeWindow::Month => &mut self.month,
        }
    }

    /// Lazily reset every expired window. Windows are independent.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Vec<TimeWindow> {
        TimeWindow::ALL
            .into_iter()
            .filter(|window| self.cell_mut(*window).reconcile(*window, now))
            .collect()
    }

    pub fn increment(&mut self) {
        for window in TimeWindow::ALL {
            self.cell_mut(window).count += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hour: self.hour.count,
            day: self.day.count,
            month: self.month.count,
        }
    }
}

/// Counts only, as returned by `GET /stats` and embedded in login responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hour: u64,
    pub day: u64,
    pub month: u64,
}
