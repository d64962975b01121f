// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Two readings are exposed: a monotonic [`Instant`] for interval math
//! (monitor cycles, call latencies) and a wall-clock UTC timestamp for
//! anything compared against file modification times or persisted.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    fn utc_now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
///
/// Both readings move together when advanced.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<(Instant, DateTime<Utc>)>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new((Instant::now(), Utc::now()))),
        }
    }

    /// Start the wall clock at a fixed timestamp
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new((Instant::now(), wall))),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.0 += duration;
        current.1 +=
            chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
