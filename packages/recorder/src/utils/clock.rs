// packages/recorder/src/utils/clock.rs
//! Clock collaborator
//!
//! Event timestamps are milliseconds on a monotonic clock relative to
//! recorder start. Date-based expiry needs the calendar date as well.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use std::time::Instant;

/// Source of event timestamps and of the current date
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since the clock's origin
    fn elapsed_ms(&self) -> u64;

    /// Today's date, used for date-based expiry
    fn today(&self) -> NaiveDate;
}

/// Wall-clock date plus a monotonic origin captured at construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Manually driven clock for tests and replay
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(u64, NaiveDate)>,
}

impl ManualClock {
    pub fn new(start_ms: u64, today: NaiveDate) -> Self {
        Self {
            state: Mutex::new((start_ms, today)),
        }
    }

    /// Move the monotonic time forward
    pub fn advance(&self, ms: u64) {
        self.state.lock().0 += ms;
    }

    /// Set the calendar date
    pub fn set_today(&self, today: NaiveDate) {
        self.state.lock().1 = today;
    }
}

impl Clock for ManualClock {
    fn elapsed_ms(&self) -> u64 {
        self.state.lock().0
    }

    fn today(&self) -> NaiveDate {
        self.state.lock().1
    }
}
