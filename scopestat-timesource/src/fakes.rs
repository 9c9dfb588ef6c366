// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::Time;

/// Simple static timesource that will always return the same instant
#[derive(Debug)]
pub struct StaticTimeSource {
    now_instant: Instant,
}

impl StaticTimeSource {
    /// Create a new StaticTimeSource frozen at the given instant
    ///
    /// # Examples
    ///
    /// ```
    /// use scopestat_timesource::{TimeSource, fakes::StaticTimeSource};
    ///
    /// let frozen = std::time::Instant::now();
    /// let ts = TimeSource::custom(StaticTimeSource::at_instant(frozen));
    /// assert_eq!(ts.instant().as_std(), frozen);
    /// ```
    pub fn at_instant(instant: Instant) -> Self {
        Self {
            now_instant: instant,
        }
    }
}

impl Time for StaticTimeSource {
    fn instant(&self) -> Instant {
        self.now_instant
    }
}

/// Dummy timesource that starts frozen, but can be moved forward
/// via any clone of the shared handle
#[derive(Debug, Clone)]
pub struct ManuallyAdvancedTimeSource(Arc<Mutex<StaticTimeSource>>);

impl ManuallyAdvancedTimeSource {
    /// Create a new ManuallyAdvancedTimeSource frozen at the current instant.
    ///
    /// You can subsequently call [`Self::advance`] to move it forward.
    pub fn new() -> Self {
        Self::at_instant(Instant::now())
    }

    /// Create a new ManuallyAdvancedTimeSource frozen at the given instant.
    pub fn at_instant(instant: Instant) -> Self {
        Self(Arc::new(Mutex::new(StaticTimeSource::at_instant(instant))))
    }

    /// Move the loaded instant forward by a duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use scopestat_timesource::{TimeSource, fakes::ManuallyAdvancedTimeSource};
    /// use std::time::Duration;
    ///
    /// let fake = ManuallyAdvancedTimeSource::new();
    /// let ts = TimeSource::custom(fake.clone());
    /// let start = ts.instant();
    ///
    /// fake.advance(Duration::from_secs(100));
    /// assert_eq!(ts.instant().saturating_duration_since(start), Duration::from_secs(100));
    /// ```
    pub fn advance(&self, elapsed: Duration) {
        let mut guard = self.0.lock().unwrap();
        guard.now_instant += elapsed;
    }
}

impl Default for ManuallyAdvancedTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Time for ManuallyAdvancedTimeSource {
    fn instant(&self) -> Instant {
        self.0.lock().unwrap().now_instant
    }
}
