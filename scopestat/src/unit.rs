// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Display units for reported durations.
//!
//! Durations are rendered by multiplying their length in seconds by a
//! [`DisplayScale`] (display units per second) and appending a unit suffix.
//! The suffix is looked up from the scale in a fixed table; a scale that matches
//! no entry is rendered with the `"?"` placeholder rather than failing.
//!
//! ```
//! # use scopestat::unit::{DisplayScale, DisplayUnit};
//! # use std::time::Duration;
//! let scale = DisplayScale::from(DisplayUnit::Milliseconds);
//! assert_eq!(scale.render(Duration::from_micros(1500)), "1.5ms");
//!
//! let odd = DisplayScale::custom(7.0);
//! assert_eq!(odd.suffix(), "?");
//! ```

use std::{fmt, time::Duration};

/// Placeholder suffix for scales with no known unit
pub const UNKNOWN_SUFFIX: &str = "?";

/// Significant digits used when rendering scaled values
const SIGNIFICANT_DIGITS: i32 = 6;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

// (nanoseconds per unit, suffix)
const SUFFIXES: &[(u64, &str)] = &[
    (1, "ns"),
    (1_000, "us"),
    (1_000_000, "ms"),
    (1_000_000_000, "s"),
    (60_000_000_000, "min"),
    (3_600_000_000_000, "h"),
    (86_400_000_000_000, "d"),
];

/// The fixed set of units durations can be displayed in
#[non_exhaustive]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayUnit {
    /// `ns`
    Nanoseconds,
    /// `us`
    Microseconds,
    /// `ms`
    Milliseconds,
    /// `s`
    #[default]
    Seconds,
    /// `min`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
}

impl DisplayUnit {
    /// Length of one unit, in nanoseconds
    pub const fn nanos(self) -> u64 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60_000_000_000,
            Self::Hours => 3_600_000_000_000,
            Self::Days => 86_400_000_000_000,
        }
    }

    /// Unit suffix appended to rendered values
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }
}

/// Scale factor applied to durations before display, in display units per second
///
/// `DisplayScale::from(DisplayUnit::Milliseconds)` is `1000.0`; the default is `1.0` (seconds).
#[derive(Clone, Copy, PartialEq)]
pub struct DisplayScale(f64);

impl DisplayScale {
    /// Use an arbitrary scale factor.
    ///
    /// Any factor is accepted. One that doesn't correspond to a [`DisplayUnit`], including
    /// zero, negative and non-finite factors, renders with the [`UNKNOWN_SUFFIX`].
    pub fn custom(per_second: f64) -> Self {
        Self(per_second)
    }

    /// Display units per second
    pub fn factor(self) -> f64 {
        self.0
    }

    /// The unit suffix for this scale, or [`UNKNOWN_SUFFIX`] if the scale isn't in the unit table
    pub fn suffix(self) -> &'static str {
        unit_suffix(self.0)
    }

    /// The scaled numeric value of `duration`
    pub fn scaled(self, duration: Duration) -> f64 {
        duration.as_secs_f64() * self.0
    }

    /// Render `duration` as `<value><suffix>`
    pub fn render(self, duration: Duration) -> String {
        let mut out = format_significant(self.scaled(duration));
        out.push_str(self.suffix());
        out
    }
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self::from(DisplayUnit::Seconds)
    }
}

impl From<DisplayUnit> for DisplayScale {
    fn from(unit: DisplayUnit) -> Self {
        Self(NANOS_PER_SECOND / unit.nanos() as f64)
    }
}

impl fmt::Debug for DisplayScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayScale({}/s, {:?})", self.0, self.suffix())
    }
}

/// Look up the unit suffix for `scale` (display units per second).
///
/// The scale is converted to nanoseconds-per-unit and rounded to the nearest
/// nanosecond; that value must match a table entry exactly.
pub fn unit_suffix(scale: f64) -> &'static str {
    if !(scale.is_finite() && scale > 0.0) {
        return UNKNOWN_SUFFIX;
    }
    let nanos = (NANOS_PER_SECOND / scale).round();
    SUFFIXES
        .iter()
        .find(|(unit_nanos, _)| *unit_nanos as f64 == nanos)
        .map_or(UNKNOWN_SUFFIX, |(_, suffix)| suffix)
}

/// Render with six significant digits in the shortest of fixed or exponent notation,
/// trimming trailing zeros: `1.5`, `0.000123457`, `1.234e+09`, `1e-05`.
pub(crate) fn format_significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    // the exponent after rounding to six digits, so 999999.7 counts as 1e+06
    let sci = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_owned()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
