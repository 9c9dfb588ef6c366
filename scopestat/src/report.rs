// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Periodic background reporting.
//!
//! A [`ReportLoop`] owns at most one background thread. The thread sleeps for the
//! loop's interval, then runs one drain-and-report cycle on the profiler, forever.
//! The interval is read when each sleep begins, so changing it never shortens or
//! extends a sleep that is already in progress.

use std::{
    fmt, io,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_utils::sync::{Parker, Unparker};

use crate::{collector::Mode, profiler::Inner};

/// The error returned when a report loop could not be started
#[derive(Debug)]
#[non_exhaustive]
pub enum EnableError {
    /// The platform refused to spawn the background thread
    Spawn(io::Error),
}

impl fmt::Display for EnableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "couldn't spawn report thread: {err}"),
        }
    }
}

impl std::error::Error for EnableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
        }
    }
}

/// What an enable call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// A new background thread was started
    Started,
    /// The loop was already running; nothing changed
    AlreadyRunning,
}

struct Running {
    handle: thread::JoinHandle<()>,
    stop_signal: Arc<AtomicBool>,
    unparker: Unparker,
}

pub(crate) struct ReportLoop {
    mode: Mode,
    thread_name: String,
    interval: Mutex<Duration>,
    running: Mutex<Option<Running>>,
}

/// Shortest sleep a report loop takes between cycles. Shorter intervals, including
/// zero, are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub(crate) fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_INTERVAL {
        tracing::warn!(
            ?interval,
            min = ?MIN_INTERVAL,
            "report interval is below the minimum, using the minimum"
        );
        MIN_INTERVAL
    } else {
        interval
    }
}

impl ReportLoop {
    pub(crate) fn new(mode: Mode, thread_name: String, interval: Duration) -> Self {
        Self {
            mode,
            thread_name,
            interval: Mutex::new(clamp_interval(interval)),
            running: Mutex::new(None),
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        *self.interval.lock().unwrap()
    }

    pub(crate) fn set_interval(&self, interval: Duration) {
        *self.interval.lock().unwrap() = clamp_interval(interval);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    pub(crate) fn enable(&self, profiler: Weak<Inner>) -> Result<EnableOutcome, EnableError> {
        let mut running = self.running.lock().unwrap();
        if running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            return Ok(EnableOutcome::AlreadyRunning);
        }

        let parker = Parker::new();
        let unparker = parker.unparker().clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            mode: self.mode,
            name: self.thread_name.clone(),
            profiler,
            stop_signal: Arc::clone(&stop_signal),
            parker,
        };

        match thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                *running = Some(Running {
                    handle,
                    stop_signal,
                    unparker,
                });
                Ok(EnableOutcome::Started)
            }
            Err(err) => {
                tracing::error!(?err, mode = %self.mode, "couldn't start report loop, it stays disabled");
                *running = None;
                Err(EnableError::Spawn(err))
            }
        }
    }

    /// Signal the thread to stop and wait for it. Returns false if nothing was running.
    pub(crate) fn stop(&self) -> bool {
        let Some(running) = self.running.lock().unwrap().take() else {
            return false;
        };
        running.stop_signal.store(true, Ordering::Relaxed);
        running.unparker.unpark();
        // a formatter or sink stopping its own loop can't wait for itself
        if running.handle.thread().id() != thread::current().id() {
            tracing::info!(mode = %self.mode, "awaiting report loop shutdown");
            if running.handle.join().is_err() {
                tracing::error!(mode = %self.mode, "report loop panicked");
            }
        }
        true
    }
}

impl fmt::Debug for ReportLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportLoop")
            .field("mode", &self.mode)
            .field("thread_name", &self.thread_name)
            .field("interval", &self.interval())
            .field("running", &self.is_running())
            .finish()
    }
}

// Background thread state. Only holds a weak reference to the profiler, so dropping
// every `Profiler` handle lets the thread exit after its current sleep.
struct Worker {
    mode: Mode,
    name: String,
    profiler: Weak<Inner>,
    stop_signal: Arc<AtomicBool>,
    parker: Parker,
}

impl Worker {
    fn run(self) {
        let span = tracing::span!(tracing::Level::TRACE, "scopestat report loop", loop_name = %self.name);
        let _enter = span.enter();
        tracing::info!(mode = %self.mode, "report loop started");

        loop {
            let Some(interval) = self
                .profiler
                .upgrade()
                .map(|profiler| profiler.report_loop(self.mode).interval())
            else {
                tracing::info!("no profiler handles left, shutting down report loop");
                return;
            };

            if !self.sleep(interval) {
                tracing::info!("caught stop signal, shutting down report loop");
                return;
            }

            let Some(profiler) = self.profiler.upgrade() else {
                tracing::info!("no profiler handles left, shutting down report loop");
                return;
            };
            let reported = profiler.report(self.mode);
            tracing::trace!(reported, "report cycle finished");
        }
    }

    // Returns false if woken by the stop signal
    fn sleep(&self, interval: Duration) -> bool {
        let deadline = Instant::now().checked_add(interval);
        loop {
            if self.stop_signal.load(Ordering::Relaxed) {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return true;
                    }
                    self.parker.park_deadline(deadline);
                }
                None => self.parker.park(),
            }
        }
    }
}
