// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Guards tying a timer to the enclosing scope.
//!
//! A [`ScopedTimer`] starts timing when it is created and runs its [`ScopeAction`] when
//! dropped. Drop runs on every way out of the scope: falling off the end, an early
//! `return`, `?` propagating an error, or a panic unwinding through it.

use std::{borrow::Cow, fmt, marker::PhantomData, time::Duration};

use crate::{Profiler, timer::Timer};

/// What a [`ScopedTimer`] does with its measurement when the scope ends
pub trait ScopeAction {
    /// Handle `elapsed`, measured for `label`
    fn on_exit(profiler: &Profiler, label: &str, elapsed: Duration);
}

/// Write the measurement to the sink immediately. See [`Profiler::scope_timer`].
#[derive(Debug)]
pub enum Log {}

/// Add the measurement to the average samples. See [`Profiler::average_timer`].
#[derive(Debug)]
pub enum Average {}

/// Add the measurement to the cumulative samples. See [`Profiler::cumulative_timer`].
#[derive(Debug)]
pub enum Cumulative {}

impl ScopeAction for Log {
    fn on_exit(profiler: &Profiler, label: &str, elapsed: Duration) {
        profiler.log_duration(label, elapsed);
    }
}

impl ScopeAction for Average {
    fn on_exit(profiler: &Profiler, label: &str, elapsed: Duration) {
        profiler.add_average_sample(label, elapsed);
    }
}

impl ScopeAction for Cumulative {
    fn on_exit(profiler: &Profiler, label: &str, elapsed: Duration) {
        profiler.add_cumulative_sample(label, elapsed);
    }
}

/// Times the enclosing scope, then runs `A` with the result when dropped
///
/// To end the measurement before the scope does, drop the guard or call
/// [`ScopedTimer::stop`].
#[must_use = "the scope is measured until this guard is dropped"]
pub struct ScopedTimer<'a, A: ScopeAction> {
    label: Cow<'a, str>,
    timer: Timer<'a>,
    _action: PhantomData<fn() -> A>,
}

/// Guard returned by [`Profiler::scope_timer`]
pub type ScopeTimer<'a> = ScopedTimer<'a, Log>;
/// Guard returned by [`Profiler::average_timer`]
pub type AverageTimer<'a> = ScopedTimer<'a, Average>;
/// Guard returned by [`Profiler::cumulative_timer`]
pub type CumulativeTimer<'a> = ScopedTimer<'a, Cumulative>;

impl<'a, A: ScopeAction> ScopedTimer<'a, A> {
    /// Start timing `label` on `profiler`
    pub fn start(profiler: &'a Profiler, label: impl Into<Cow<'a, str>>) -> Self {
        Self {
            label: label.into(),
            timer: Timer::start(profiler),
            _action: PhantomData,
        }
    }

    /// The label this guard reports under
    pub fn label(&self) -> &str {
        &self.label
    }

    /// End the measurement now. Equivalent to dropping the guard.
    pub fn stop(self) {}
}

impl<A: ScopeAction> Drop for ScopedTimer<'_, A> {
    fn drop(&mut self) {
        let elapsed = self.timer.stop();
        A::on_exit(self.timer.clock(), &self.label, elapsed);
    }
}

impl<A: ScopeAction> fmt::Debug for ScopedTimer<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedTimer")
            .field("label", &self.label)
            .field("timer", &self.timer)
            .field("action", &std::any::type_name::<A>())
            .finish()
    }
}
