// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Formatters turning measurements into lines of text.
//!
//! A [`ValueFormat`] renders one `(label, duration)` measurement. An [`EpochFormat`]
//! renders the line written ahead of every aggregated value, given the instant the
//! reporting period started and the current instant. Both are installed on a [`Profiler`](crate::Profiler) and
//! can be swapped at runtime.
//!
//! Closures work as custom formatters:
//!
//! ```
//! # use scopestat::{Profiler, unit::DisplayScale};
//! # use std::time::Duration;
//! let profiler = Profiler::new();
//! profiler.set_value_format(|label: &str, d: Duration, scale: DisplayScale| {
//!     format!("(custom output) {label} took {}", scale.render(d))
//! });
//! ```

use std::time::Duration;

use scopestat_timesource::Instant;

use crate::unit::DisplayScale;

/// Renders a single labelled duration
pub trait ValueFormat: Send + Sync {
    /// Format `duration`, measured at the site named `label`, using `scale`
    fn format_value(&self, label: &str, duration: Duration, scale: DisplayScale) -> String;
}

/// Renders information about the current reporting period
pub trait EpochFormat: Send + Sync {
    /// Format the period that began at `epoch_start`. `now` is read from the profiler's
    /// current time source just before the call.
    fn format_epoch(&self, epoch_start: Instant, now: Instant, scale: DisplayScale) -> String;
}

/// `"<label> took <value><unit>"`. The default [`ValueFormat`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Took;

impl ValueFormat for Took {
    fn format_value(&self, label: &str, duration: Duration, scale: DisplayScale) -> String {
        format!("{label} took {}", scale.render(duration))
    }
}

/// `"<label>: <value><unit>"`
#[derive(Debug, Default, Clone, Copy)]
pub struct Colon;

impl ValueFormat for Colon {
    fn format_value(&self, label: &str, duration: Duration, scale: DisplayScale) -> String {
        format!("{label}: {}", scale.render(duration))
    }
}

/// `"elapsed time: <value><unit>"`, measured from the epoch start. The default [`EpochFormat`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ElapsedTime;

impl EpochFormat for ElapsedTime {
    fn format_epoch(&self, epoch_start: Instant, now: Instant, scale: DisplayScale) -> String {
        let elapsed = now.saturating_duration_since(epoch_start);
        format!("elapsed time: {}", scale.render(elapsed))
    }
}

impl<F> ValueFormat for F
where
    F: Fn(&str, Duration, DisplayScale) -> String + Send + Sync,
{
    fn format_value(&self, label: &str, duration: Duration, scale: DisplayScale) -> String {
        self(label, duration, scale)
    }
}

impl<F> EpochFormat for F
where
    F: Fn(Instant, Instant, DisplayScale) -> String + Send + Sync,
{
    fn format_epoch(&self, epoch_start: Instant, now: Instant, scale: DisplayScale) -> String {
        self(epoch_start, now, scale)
    }
}
