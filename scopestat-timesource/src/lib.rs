// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::{
    fmt::Debug,
    ops::Add,
    sync::Arc,
    time::{Duration, Instant as StdInstant, SystemTime},
};

/// Module containing fake time sources for testing
///
/// To enable this module, you must enable the `test-util` feature.
#[cfg(feature = "test-util")]
pub mod fakes;

/// Trait for providing custom time sources
///
/// Implementors of this trait can be used to provide custom time behavior
/// for testing or specialized use cases.
pub trait Time: Send + Sync + Debug {
    /// Get the current instant
    fn instant(&self) -> StdInstant;
}

/// Enum representing different time source options
///
/// TimeSource provides a unified interface for reading "now", whether from the monotonic
/// system clock, the wall clock, or from a custom time source for testing.
#[derive(Clone, Default)]
pub enum TimeSource {
    /// Use the monotonic system clock
    #[default]
    System,
    /// Use a custom time source
    Custom(Arc<dyn Time>),
}

impl std::fmt::Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "TimeSource::System"),
            Self::Custom(ts) => write!(f, "TimeSource::Custom({ts:?})"),
        }
    }
}

impl TimeSource {
    /// Get the current instant from this time source
    ///
    /// # Examples
    ///
    /// ```
    /// use scopestat_timesource::TimeSource;
    ///
    /// let ts = TimeSource::System;
    /// let start = ts.instant();
    /// let end = ts.instant();
    /// assert!(end >= start);
    /// ```
    pub fn instant(&self) -> Instant {
        match self {
            Self::System => Instant::from_std(StdInstant::now()),
            Self::Custom(ts) => Instant::from_std(ts.instant()),
        }
    }

    /// Create a new TimeSource with a custom time implementation
    ///
    /// # Examples
    ///
    /// ```
    /// use scopestat_timesource::{TimeSource, WallClock};
    ///
    /// let ts = TimeSource::custom(WallClock::new());
    /// let _now = ts.instant();
    /// ```
    pub fn custom(custom: impl Time + 'static) -> TimeSource {
        Self::Custom(Arc::new(custom))
    }

    /// Create a TimeSource that follows the system wall clock. See [`WallClock`].
    pub fn wall_clock() -> TimeSource {
        Self::custom(WallClock::new())
    }
}

/// A time source that follows [`SystemTime`] rather than the monotonic clock
///
/// Instants are anchored to the moment the clock was created, and move with the wall
/// clock after that. If the wall clock is set backwards past the anchor, instants stay
/// at the anchor rather than going backwards.
#[derive(Copy, Clone, Debug)]
pub struct WallClock {
    start_instant: StdInstant,
    start_system_time: SystemTime,
}

impl WallClock {
    /// Create a new WallClock anchored at the current system time
    pub fn new() -> Self {
        Self {
            start_instant: StdInstant::now(),
            start_system_time: SystemTime::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Time for WallClock {
    fn instant(&self) -> StdInstant {
        let since_start = SystemTime::now()
            .duration_since(self.start_system_time)
            .unwrap_or_default();
        self.start_instant + since_start
    }
}

/// `Instant` wrapper
///
/// Instants are plain points in time. They are only meaningfully comparable with
/// instants read from the same time source; mixing sources yields arbitrary (but
/// never panicking) durations.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Instant {
    value: StdInstant,
}

impl std::fmt::Debug for Instant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl From<Instant> for StdInstant {
    fn from(instant: Instant) -> StdInstant {
        instant.as_std()
    }
}

impl From<StdInstant> for Instant {
    fn from(value: StdInstant) -> Self {
        Self::from_std(value)
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(mut self, rhs: Duration) -> Self::Output {
        self.value += rhs;
        self
    }
}

impl Instant {
    /// Read the current instant from the given TimeSource
    pub fn now(ts: &TimeSource) -> Self {
        ts.instant()
    }

    /// Wrap a [`std::time::Instant`]
    pub fn from_std(value: StdInstant) -> Self {
        Self { value }
    }

    /// The amount of time from `earlier` to `self`, or zero if `earlier` is later
    ///
    /// # Examples
    ///
    /// ```
    /// use scopestat_timesource::TimeSource;
    ///
    /// let ts = TimeSource::System;
    /// let a = ts.instant();
    /// let b = ts.instant();
    /// assert_eq!(a.saturating_duration_since(b), std::time::Duration::ZERO);
    /// ```
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        self.value.saturating_duration_since(earlier.value)
    }

    /// Convert this Instant to a std::time::Instant
    pub fn as_std(&self) -> StdInstant {
        self.value
    }
}
