// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod collector;
pub mod format;
mod global;
pub mod guard;
mod profiler;
mod rate_limit;
mod report;
pub mod sink;
mod timer;
pub mod unit;

pub use collector::Mode;
pub use global::global;
pub use guard::{AverageTimer, CumulativeTimer, ScopeTimer, ScopedTimer};
pub use profiler::{Profiler, ProfilerBuilder};
pub use report::{EnableError, EnableOutcome, MIN_INTERVAL};
pub use timer::{Clock, Timer};
pub use unit::{DisplayScale, DisplayUnit};

pub use scopestat_timesource::{Instant, TimeSource};

/// Re-export of the time source crate, for custom clocks and test fakes
pub use scopestat_timesource as timesource;
