// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::EpochMs;

/// A clock that provides the current time.
///
/// The supervisor, buffer and notifier all take a clock so that sweeps,
/// flush windows and graceful-shutdown countdowns are testable without
/// real sleeps.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> EpochMs;

    /// Epoch seconds, for wire payloads and countdown display.
    fn epoch_secs(&self) -> i64 {
        self.epoch_ms() / 1000
    }
}

/// Real system clock
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> EpochMs {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as EpochMs
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake clock for testing with controllable time
    #[derive(Clone)]
    pub struct FakeClock {
        inner: Arc<Mutex<FakeClockState>>,
    }

    struct FakeClockState {
        now: Instant,
        epoch_ms: EpochMs,
    }

    impl FakeClock {
        /// Start at an arbitrary fixed epoch (2026-01-01T00:00:00Z).
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeClockState {
                    now: Instant::now(),
                    epoch_ms: 1_767_225_600_000,
                })),
            }
        }

        /// Advance the clock by the given duration
        pub fn advance(&self, duration: Duration) {
            let mut state = self.inner.lock();
            state.now += duration;
            state.epoch_ms += duration.as_millis() as EpochMs;
        }

        /// Set the epoch milliseconds value
        pub fn set_epoch_ms(&self, ms: EpochMs) {
            self.inner.lock().epoch_ms = ms;
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.inner.lock().now
        }

        fn epoch_ms(&self) -> EpochMs {
            self.inner.lock().epoch_ms
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClock;

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
