// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
///
/// All timestamping goes through this trait so tests can drive time
/// deterministically with [`FakeClock`].
pub trait Clock: Send + Sync {
    /// Monotonic instant, for deadlines and elapsed measurements.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, for persisted timestamps.
    fn epoch_ms(&self) -> u64;
}

/// Production clock backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually-advanced clock for tests. Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

#[derive(Debug)]
struct FakeClockState {
    base: Instant,
    offset: Duration,
    epoch_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                base: Instant::now(),
                offset: Duration::ZERO,
                epoch_ms: 1_000_000,
            })),
        }
    }

    /// Move both monotonic and wall-clock time forward.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock();
        state.offset += delta;
        state.epoch_ms += delta.as_millis() as u64;
    }

    /// Pin the wall clock to an exact epoch-ms value.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.inner.lock().epoch_ms = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let state = self.inner.lock();
        state.base + state.offset
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
