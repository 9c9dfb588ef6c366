// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use scopestat_timesource::{Instant, TimeSource};

use crate::{
    collector::{Mode, SampleCollector},
    format::{ElapsedTime, EpochFormat, Took, ValueFormat},
    guard::{Average, Cumulative, Log, ScopedTimer},
    report::{EnableError, EnableOutcome, ReportLoop},
    sink::{Sink, StdoutSink, flush_or_log, write_or_log},
    timer::Timer,
    unit::{DisplayScale, DisplayUnit},
};

/// Builder for [`Profiler`]
pub struct ProfilerBuilder {
    time_source: TimeSource,
    scale: DisplayScale,
    value_format: Arc<dyn ValueFormat>,
    epoch_format: Arc<dyn EpochFormat>,
    sink: Arc<dyn Sink>,
    average_interval: Duration,
    cumulative_interval: Duration,
    average_thread_name: String,
    cumulative_thread_name: String,
}

impl Default for ProfilerBuilder {
    fn default() -> Self {
        Self {
            time_source: TimeSource::System,
            scale: DisplayScale::default(),
            value_format: Arc::new(Took),
            epoch_format: Arc::new(ElapsedTime),
            sink: Arc::new(StdoutSink),
            average_interval: Duration::from_secs(1),
            cumulative_interval: Duration::from_secs(1),
            average_thread_name: "scopestat-average".into(),
            cumulative_thread_name: "scopestat-cumulative".into(),
        }
    }
}

impl ProfilerBuilder {
    /// A builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// The time source every timer and report reads "now" from.
    ///
    /// Defaults to the monotonic system clock.
    pub fn time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Unit reported durations are displayed in. Defaults to seconds.
    pub fn display_unit(self, unit: DisplayUnit) -> Self {
        self.display_scale(unit.into())
    }

    /// Scale reported durations are displayed in. See [`DisplayScale`].
    pub fn display_scale(mut self, scale: DisplayScale) -> Self {
        self.scale = scale;
        self
    }

    /// Formatter for `(label, duration)` lines. Defaults to [`Took`].
    pub fn value_format(mut self, format: impl ValueFormat + 'static) -> Self {
        self.value_format = Arc::new(format);
        self
    }

    /// Formatter for the epoch line preceding every aggregated value. It receives the epoch
    /// start and the current instant. Defaults to [`ElapsedTime`].
    pub fn epoch_format(mut self, format: impl EpochFormat + 'static) -> Self {
        self.epoch_format = Arc::new(format);
        self
    }

    /// Destination for report lines. Defaults to [`StdoutSink`].
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// How long the background loop of `mode` sleeps between reports. Defaults to one second.
    ///
    /// Intervals shorter than [`MIN_INTERVAL`](crate::MIN_INTERVAL), including zero, are
    /// raised to it.
    pub fn interval(mut self, mode: Mode, interval: Duration) -> Self {
        match mode {
            Mode::Average => self.average_interval = interval,
            Mode::Cumulative => self.cumulative_interval = interval,
        }
        self
    }

    /// Thread name of the background loop of `mode`.
    ///
    /// Defaults to `scopestat-average` and `scopestat-cumulative`.
    /// An empty name is ignored.
    pub fn thread_name(mut self, mode: Mode, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            return self;
        }
        match mode {
            Mode::Average => self.average_thread_name = name,
            Mode::Cumulative => self.cumulative_thread_name = name,
        }
        self
    }

    /// Build the [`Profiler`]. No background thread is started until
    /// [`Profiler::enable`] is called.
    pub fn build(self) -> Profiler {
        Profiler(Arc::new(Inner {
            time_source: RwLock::new(self.time_source),
            scale: RwLock::new(self.scale),
            value_format: RwLock::new(self.value_format),
            epoch_format: RwLock::new(self.epoch_format),
            sink: RwLock::new(self.sink),
            epoch_start: Mutex::new(None),
            averages: SampleCollector::new(Mode::Average),
            cumulative: SampleCollector::new(Mode::Cumulative),
            average_loop: ReportLoop::new(
                Mode::Average,
                self.average_thread_name,
                self.average_interval,
            ),
            cumulative_loop: ReportLoop::new(
                Mode::Cumulative,
                self.cumulative_thread_name,
                self.cumulative_interval,
            ),
        }))
    }
}

/// Shared instrumentation context
///
/// A `Profiler` holds the configuration (time source, display scale, formatters, sink,
/// report intervals) and the state (sample collectors, epoch start, background loops)
/// that every timer and report uses. Cloning is cheap and yields another handle to the
/// same context. Every setting can be replaced at runtime; the change takes effect for
/// the next measurement or report, including reports made by a loop that is already
/// running.
///
/// Most code measures through scoped guards:
///
/// ```
/// use scopestat::{Profiler, sink::VecSink};
///
/// let sink = VecSink::new();
/// let profiler = Profiler::builder().sink(sink.clone()).build();
///
/// {
///     let _t = profiler.scope_timer("startup");
///     // ... work ...
/// } // "startup took <...>s" is written here
///
/// for _ in 0..10 {
///     let _t = profiler.average_timer("request");
///     // ... work ...
/// }
/// profiler.log_averages();
/// assert_eq!(sink.lines().len(), 3);
/// ```
///
/// For a process-wide instance, see [`global`](crate::global()).
#[derive(Clone)]
pub struct Profiler(Arc<Inner>);

pub(crate) struct Inner {
    time_source: RwLock<TimeSource>,
    scale: RwLock<DisplayScale>,
    value_format: RwLock<Arc<dyn ValueFormat>>,
    epoch_format: RwLock<Arc<dyn EpochFormat>>,
    sink: RwLock<Arc<dyn Sink>>,
    epoch_start: Mutex<Option<Instant>>,
    averages: SampleCollector,
    cumulative: SampleCollector,
    average_loop: ReportLoop,
    cumulative_loop: ReportLoop,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("time_source", &*self.0.time_source.read().unwrap())
            .field("scale", &self.scale())
            .field("epoch_start", &self.epoch_start())
            .field("averages", &self.0.averages)
            .field("cumulative", &self.0.cumulative)
            .field("average_loop", &self.0.average_loop)
            .field("cumulative_loop", &self.0.cumulative_loop)
            .finish_non_exhaustive()
    }
}

impl Profiler {
    /// A profiler with the default configuration. See [`ProfilerBuilder`].
    pub fn new() -> Self {
        ProfilerBuilder::new().build()
    }

    /// Start configuring a profiler
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::new()
    }

    // ---- time source and display ----

    /// The current instant according to the installed time source
    pub fn now(&self) -> Instant {
        self.0.now()
    }

    /// Replace the time source.
    ///
    /// Instants captured before the swap are not adjusted: a timer that is running
    /// across a swap compares instants from two different sources.
    pub fn set_time_source(&self, time_source: TimeSource) {
        *self.0.time_source.write().unwrap() = time_source;
    }

    /// The installed display scale
    pub fn scale(&self) -> DisplayScale {
        *self.0.scale.read().unwrap()
    }

    /// Display durations in `unit`
    pub fn set_display_unit(&self, unit: DisplayUnit) {
        self.set_display_scale(unit.into());
    }

    /// Display durations using `scale`
    pub fn set_display_scale(&self, scale: DisplayScale) {
        *self.0.scale.write().unwrap() = scale;
    }

    /// Replace the `(label, duration)` formatter
    pub fn set_value_format(&self, format: impl ValueFormat + 'static) {
        *self.0.value_format.write().unwrap() = Arc::new(format);
    }

    /// Replace the epoch-line formatter
    pub fn set_epoch_format(&self, format: impl EpochFormat + 'static) {
        *self.0.epoch_format.write().unwrap() = Arc::new(format);
    }

    /// Replace the output sink. Lines written after this call go to `sink` only.
    pub fn set_sink(&self, sink: impl Sink + 'static) {
        let previous = std::mem::replace(&mut *self.0.sink.write().unwrap(), Arc::new(sink));
        flush_or_log(&*previous);
    }

    // ---- epoch ----

    /// Mark `instant` as the start of the current reporting period. Last write wins.
    pub fn set_epoch_start(&self, instant: Instant) {
        *self.0.epoch_start.lock().unwrap() = Some(instant);
    }

    /// Mark now as the start of the current reporting period
    pub fn set_epoch_start_now(&self) {
        self.set_epoch_start(self.now());
    }

    /// The start of the current reporting period, if one has been set
    pub fn epoch_start(&self) -> Option<Instant> {
        *self.0.epoch_start.lock().unwrap()
    }

    // ---- measuring ----

    /// Start a manual [`Timer`] on this profiler's time source
    pub fn timer(&self) -> Timer<'_> {
        Timer::start(self)
    }

    /// Time the enclosing scope and write `"<label> took <duration>"` to the sink when it ends
    pub fn scope_timer<'a>(&'a self, label: impl Into<Cow<'a, str>>) -> ScopedTimer<'a, Log> {
        ScopedTimer::start(self, label)
    }

    /// Time the enclosing scope and add the duration to the average samples for `label`
    pub fn average_timer<'a>(
        &'a self,
        label: impl Into<Cow<'a, str>>,
    ) -> ScopedTimer<'a, Average> {
        ScopedTimer::start(self, label)
    }

    /// Time the enclosing scope and add the duration to the cumulative samples for `label`
    pub fn cumulative_timer<'a>(
        &'a self,
        label: impl Into<Cow<'a, str>>,
    ) -> ScopedTimer<'a, Cumulative> {
        ScopedTimer::start(self, label)
    }

    /// Run `f`, writing how long it took to the sink, and return its result
    pub fn time_scope<R>(&self, label: &str, f: impl FnOnce() -> R) -> R {
        let _guard = self.scope_timer(label);
        f()
    }

    /// Format `duration` with the installed value formatter and write it to the sink
    pub fn log_duration(&self, label: &str, duration: Duration) {
        let value_format = Arc::clone(&*self.0.value_format.read().unwrap());
        let line = value_format.format_value(label, duration, self.scale());
        let sink = self.0.sink();
        write_or_log(&*sink, &line);
        flush_or_log(&*sink);
    }

    // ---- collecting ----

    /// Record one average-mode sample for `label`
    pub fn add_average_sample(&self, label: &str, duration: Duration) {
        self.0.averages.add(label, duration);
    }

    /// Record one cumulative-mode sample for `label`
    pub fn add_cumulative_sample(&self, label: &str, duration: Duration) {
        self.0.cumulative.add(label, duration);
    }

    /// Take the pending average samples, returning the mean per label
    pub fn drain_averages(&self) -> BTreeMap<String, Duration> {
        self.0.averages.drain()
    }

    /// Take the pending cumulative samples, returning the sum per (decorated) label.
    /// See [`CUMULATIVE_SUFFIX`](crate::collector::CUMULATIVE_SUFFIX).
    pub fn drain_cumulative(&self) -> BTreeMap<String, Duration> {
        self.0.cumulative.drain()
    }

    // ---- reporting ----

    /// Run one drain-and-report cycle for `mode` now, whether or not its loop is running.
    ///
    /// For every label with samples, writes the elapsed-time line followed by the value
    /// line. Returns the number of labels reported.
    pub fn report_now(&self, mode: Mode) -> usize {
        self.0.report(mode)
    }

    /// `report_now(Mode::Average)`
    pub fn log_averages(&self) -> usize {
        self.report_now(Mode::Average)
    }

    /// `report_now(Mode::Cumulative)`
    pub fn log_cumulative(&self) -> usize {
        self.report_now(Mode::Cumulative)
    }

    /// The sleep interval of `mode`'s loop
    pub fn interval(&self, mode: Mode) -> Duration {
        self.0.report_loop(mode).interval()
    }

    /// Change how long `mode`'s loop sleeps between reports.
    ///
    /// A sleep that is already in progress is not affected; the next one uses `interval`.
    /// Intervals shorter than [`MIN_INTERVAL`](crate::MIN_INTERVAL), including zero, are
    /// raised to it.
    pub fn set_interval(&self, mode: Mode, interval: Duration) {
        self.0.report_loop(mode).set_interval(interval);
    }

    /// Start the background report loop for `mode`, unless it is already running.
    ///
    /// If no epoch start has been set, it is set to now first. The loop then runs until
    /// [`Profiler::stop`] is called or every handle to this profiler is dropped.
    ///
    /// If the thread can't be spawned the failure is logged and returned, and the loop
    /// stays disabled; calling `enable` again retries.
    pub fn enable(&self, mode: Mode) -> Result<EnableOutcome, EnableError> {
        self.0.epoch_start_or_now();
        self.0.report_loop(mode).enable(Arc::downgrade(&self.0))
    }

    /// `enable(Mode::Average)`
    pub fn enable_averaging(&self) -> Result<EnableOutcome, EnableError> {
        self.enable(Mode::Average)
    }

    /// `enable(Mode::Cumulative)`
    pub fn enable_cumulative(&self) -> Result<EnableOutcome, EnableError> {
        self.enable(Mode::Cumulative)
    }

    /// True while `mode`'s background loop is running
    pub fn is_running(&self, mode: Mode) -> bool {
        self.0.report_loop(mode).is_running()
    }

    /// Stop `mode`'s background loop and wait for its thread to exit.
    ///
    /// Pending samples are left in place for the next report. Returns false if the
    /// loop wasn't running. The loop can be enabled again afterwards.
    pub fn stop(&self, mode: Mode) -> bool {
        self.0.report_loop(mode).stop()
    }
}

impl Inner {
    pub(crate) fn now(&self) -> Instant {
        self.time_source.read().unwrap().instant()
    }

    fn sink(&self) -> Arc<dyn Sink> {
        Arc::clone(&*self.sink.read().unwrap())
    }

    fn epoch_start_or_now(&self) -> Instant {
        let mut epoch_start = self.epoch_start.lock().unwrap();
        *epoch_start.get_or_insert_with(|| self.now())
    }

    pub(crate) fn report_loop(&self, mode: Mode) -> &ReportLoop {
        match mode {
            Mode::Average => &self.average_loop,
            Mode::Cumulative => &self.cumulative_loop,
        }
    }

    fn collector(&self, mode: Mode) -> &SampleCollector {
        match mode {
            Mode::Average => &self.averages,
            Mode::Cumulative => &self.cumulative,
        }
    }

    pub(crate) fn report(&self, mode: Mode) -> usize {
        let drained = self.collector(mode).drain();
        if drained.is_empty() {
            return 0;
        }

        let epoch_start = self.epoch_start_or_now();
        // one snapshot of the configuration per cycle
        let scale = *self.scale.read().unwrap();
        let value_format = Arc::clone(&*self.value_format.read().unwrap());
        let epoch_format = Arc::clone(&*self.epoch_format.read().unwrap());
        let sink = self.sink();

        for (label, aggregated) in &drained {
            write_or_log(&*sink, &epoch_format.format_epoch(epoch_start, self.now(), scale));
            write_or_log(&*sink, &value_format.format_value(label, *aggregated, scale));
        }
        flush_or_log(&*sink);
        drained.len()
    }
}
