// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The process-wide profiler and the macros built on it.

use std::sync::OnceLock;

use crate::Profiler;

static GLOBAL: OnceLock<Profiler> = OnceLock::new();

/// The process-wide [`Profiler`], created with the default configuration on first use.
///
/// Everything on it can be reconfigured at runtime, so there is no separate
/// initialization step. Libraries that want isolation should build their own
/// [`Profiler`] instead.
pub fn global() -> &'static Profiler {
    GLOBAL.get_or_init(Profiler::new)
}

/// Time the rest of the enclosing scope and write the duration to the sink when it ends.
///
/// With one argument this uses [`global()`]; pass a profiler first to use another one.
///
/// ```
/// fn load() {
///     scopestat::scope_timer!("load");
///     // ...
/// }
/// # load();
/// ```
#[macro_export]
macro_rules! scope_timer {
    ($label:expr) => {
        let _scopestat_guard = $crate::Profiler::scope_timer($crate::global(), $label);
    };
    ($profiler:expr, $label:expr) => {
        let _scopestat_guard = $crate::Profiler::scope_timer(&$profiler, $label);
    };
}

/// Time the rest of the enclosing scope and add it to the average samples.
///
/// With one argument this uses [`global()`]; pass a profiler first to use another one.
#[macro_export]
macro_rules! average_timer {
    ($label:expr) => {
        let _scopestat_guard = $crate::Profiler::average_timer($crate::global(), $label);
    };
    ($profiler:expr, $label:expr) => {
        let _scopestat_guard = $crate::Profiler::average_timer(&$profiler, $label);
    };
}

/// Time the rest of the enclosing scope and add it to the cumulative samples.
///
/// With one argument this uses [`global()`]; pass a profiler first to use another one.
#[macro_export]
macro_rules! cumulative_timer {
    ($label:expr) => {
        let _scopestat_guard = $crate::Profiler::cumulative_timer($crate::global(), $label);
    };
    ($profiler:expr, $label:expr) => {
        let _scopestat_guard = $crate::Profiler::cumulative_timer(&$profiler, $label);
    };
}
