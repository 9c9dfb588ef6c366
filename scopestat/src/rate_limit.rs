// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

// Whole seconds since the first limiter in the process was consulted
fn uptime_secs() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs()
}

/// Lets one event through per window, across all threads
///
/// Meant to live in a `static` next to a log statement that could otherwise fire on
/// every report cycle:
///
/// ```ignore
/// static FAILURES: RateLimiter = RateLimiter::per_window(Duration::from_secs(60));
/// if FAILURES.allow() {
///     tracing::warn!("...");
/// }
/// ```
pub(crate) struct RateLimiter {
    window_secs: u64,
    next_allowed: AtomicU64,
}

impl RateLimiter {
    /// `window` has second granularity; anything shorter counts as one second.
    pub(crate) const fn per_window(window: Duration) -> Self {
        let secs = window.as_secs();
        Self {
            window_secs: if secs == 0 { 1 } else { secs },
            next_allowed: AtomicU64::new(0),
        }
    }

    pub(crate) fn allow(&self) -> bool {
        self.allow_at(uptime_secs())
    }

    fn allow_at(&self, now_secs: u64) -> bool {
        let next = self.next_allowed.load(Ordering::Relaxed);
        // losing the exchange means another thread took this window
        now_secs >= next
            && self
                .next_allowed
                .compare_exchange(
                    next,
                    now_secs.saturating_add(self.window_secs),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
    }
}
