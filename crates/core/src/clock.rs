// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock sources.
//!
//! Timestamps on queued operations, retention cutoffs and the "synced today"
//! statistic all read the time through [`ClockSource`], so a manual clock can
//! be injected for testing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Trait for getting the current wall clock time.
pub trait ClockSource: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using `chrono::Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: ClockSource> ClockSource for &C {
    fn now(&self) -> DateTime<Utc> {
        (*self).now()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// A clock that only moves when told to.
///
/// Millisecond resolution; shareable across tasks.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at the given instant.
    pub fn new(at: DateTime<Utc>) -> Self {
        ManualClock {
            now_ms: AtomicI64::new(at.timestamp_millis()),
        }
    }

    /// Jumps to the given instant.
    pub fn set(&self, at: DateTime<Utc>) {
        self.now_ms.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
