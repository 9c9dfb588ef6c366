// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, time::Duration};

use scopestat_timesource::{Instant, TimeSource};

use crate::Profiler;

/// Anything that can say what time it is
///
/// Implemented for [`TimeSource`] and for [`Profiler`], which reads whichever time source
/// is currently installed on it.
pub trait Clock {
    /// The current instant
    fn now(&self) -> Instant;
}

impl Clock for TimeSource {
    fn now(&self) -> Instant {
        self.instant()
    }
}

impl Clock for Profiler {
    fn now(&self) -> Instant {
        Profiler::now(self)
    }
}

/// Manual span timer
///
/// Records the instant it was started and, on [`Timer::stop`], reports the time elapsed
/// since then. `stop` does not consume the timer, so calling it again measures from the
/// same start. A timer is not bound to any scope; see [`ScopedTimer`](crate::ScopedTimer)
/// for that.
///
/// # Example
/// ```
/// use scopestat::{Profiler, Timer};
/// use std::thread::sleep;
/// use std::time::Duration;
///
/// let profiler = Profiler::new();
/// let timer = Timer::start(&profiler);
/// sleep(Duration::from_millis(10));
/// let elapsed = timer.stop();
/// assert!(elapsed >= Duration::from_millis(10));
/// ```
pub struct Timer<'a, C: Clock + ?Sized = Profiler> {
    clock: &'a C,
    start: Instant,
}

impl<'a, C: Clock + ?Sized> Timer<'a, C> {
    /// Start a timer reading time from `clock`
    pub fn start(clock: &'a C) -> Self {
        Self {
            start: clock.now(),
            clock,
        }
    }

    /// Reset the start instant to now
    pub fn restart(&mut self) {
        self.start = self.clock.now();
    }

    /// Time elapsed since the timer was started.
    ///
    /// The end instant is read from the clock's current time source. If the source was
    /// swapped after the timer started, the result compares instants from two different
    /// sources and is clamped at zero rather than going negative.
    pub fn stop(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// The instant the timer was (re)started at
    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// The clock this timer reads from
    pub fn clock(&self) -> &'a C {
        self.clock
    }
}

impl<C: Clock + ?Sized> fmt::Debug for Timer<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer").field("start", &self.start).finish()
    }
}
