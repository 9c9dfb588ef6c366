// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use assert2::check;
use scopestat::{
    DisplayScale, EnableOutcome, MIN_INTERVAL, Mode, Profiler, TimeSource, format::Colon,
    sink::VecSink,
};
use scopestat_timesource::fakes::ManuallyAdvancedTimeSource;

const PATIENCE: Duration = Duration::from_secs(10);

fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn profiler_with_sink(interval: Duration) -> (Profiler, VecSink) {
    let sink = VecSink::new();
    let profiler = Profiler::builder()
        .sink(sink.clone())
        .interval(Mode::Average, interval)
        .interval(Mode::Cumulative, interval)
        .build();
    (profiler, sink)
}

#[test]
fn averaging_loop_reports_pending_samples() {
    let (profiler, sink) = profiler_with_sink(Duration::from_millis(20));
    check!(!profiler.is_running(Mode::Average));
    check!(profiler.enable_averaging().unwrap() == EnableOutcome::Started);
    check!(profiler.is_running(Mode::Average));

    for _ in 0..5 {
        profiler.add_average_sample("work", Duration::from_millis(100));
    }
    check!(eventually(|| sink.lines().len() >= 2));

    let lines = sink.lines();
    check!(lines[0].starts_with("elapsed time: "));
    check!(lines[1] == "work took 0.1s");
    check!(profiler.stop(Mode::Average));
}

#[test]
fn loops_are_independent_per_mode() {
    let (profiler, sink) = profiler_with_sink(Duration::from_millis(20));
    profiler.enable_cumulative().unwrap();
    check!(profiler.is_running(Mode::Cumulative));
    check!(!profiler.is_running(Mode::Average));

    profiler.add_average_sample("io", Duration::from_millis(1));
    profiler.add_cumulative_sample("io", Duration::from_millis(2));
    profiler.add_cumulative_sample("io", Duration::from_millis(3));
    check!(eventually(|| sink.lines().len() >= 2));
    check!(sink.lines()[1] == "io (cumulative) took 0.005s");

    // the average samples are untouched until that mode reports
    check!(profiler.drain_averages().get("io") == Some(&Duration::from_millis(1)));
    check!(profiler.enable_averaging().unwrap() == EnableOutcome::Started);
    check!(profiler.stop(Mode::Average));
    check!(profiler.stop(Mode::Cumulative));
}

#[test]
fn enable_is_at_most_once_and_can_restart_after_stop() {
    let (profiler, _sink) = profiler_with_sink(Duration::from_secs(3600));
    check!(profiler.enable(Mode::Average).unwrap() == EnableOutcome::Started);
    check!(profiler.enable(Mode::Average).unwrap() == EnableOutcome::AlreadyRunning);

    // stop wakes the loop out of its hour-long sleep
    let started = Instant::now();
    check!(profiler.stop(Mode::Average));
    check!(started.elapsed() < PATIENCE);
    check!(!profiler.is_running(Mode::Average));

    check!(profiler.enable(Mode::Average).unwrap() == EnableOutcome::Started);
    check!(profiler.is_running(Mode::Average));
    check!(profiler.stop(Mode::Average));
}

#[test]
fn stopped_loop_leaves_samples_for_manual_reports() {
    let (profiler, sink) = profiler_with_sink(Duration::from_secs(3600));
    profiler.enable_averaging().unwrap();
    profiler.add_average_sample("kept", Duration::from_secs(2));
    profiler.stop(Mode::Average);

    check!(sink.lines().is_empty());
    check!(profiler.log_averages() == 1);
    check!(sink.lines()[1] == "kept took 2s");
}

#[test]
fn sink_swap_redirects_a_running_loop() {
    let (profiler, first) = profiler_with_sink(Duration::from_millis(20));
    profiler.enable_averaging().unwrap();

    profiler.add_average_sample("before", Duration::from_millis(1));
    check!(eventually(|| first.lines().len() >= 2));

    let second = VecSink::new();
    profiler.set_sink(second.clone());
    profiler.add_average_sample("after", Duration::from_millis(1));
    check!(eventually(|| second.lines().len() >= 2));
    profiler.stop(Mode::Average);

    check!(first.lines().iter().all(|line| !line.contains("after")));
    check!(second.lines().iter().all(|line| !line.contains("before")));
}

#[test]
fn formatter_swap_reaches_a_running_loop() {
    let (profiler, sink) = profiler_with_sink(Duration::from_millis(20));
    profiler.enable_averaging().unwrap();

    profiler.add_average_sample("db", Duration::from_millis(2));
    check!(eventually(|| sink.lines().len() >= 2));
    check!(sink.drain()[1] == "db took 0.002s");

    profiler.set_value_format(Colon);
    profiler.set_epoch_format(
        |_start: scopestat::Instant, _now: scopestat::Instant, _scale: DisplayScale| {
            String::from("new period line")
        },
    );
    profiler.add_average_sample("db", Duration::from_millis(3));
    check!(eventually(|| sink.lines().len() >= 2));
    profiler.stop(Mode::Average);

    check!(sink.lines() == ["new period line", "db: 0.003s"]);
}

#[test]
fn time_source_swap_reaches_a_running_loop() {
    let before = ManuallyAdvancedTimeSource::new();
    let sink = VecSink::new();
    let profiler = Profiler::builder()
        .time_source(TimeSource::custom(before.clone()))
        .sink(sink.clone())
        .interval(Mode::Cumulative, Duration::from_millis(20))
        .build();
    profiler.set_epoch_start_now();
    let epoch_start = profiler.epoch_start().unwrap();
    profiler.enable_cumulative().unwrap();

    profiler.add_cumulative_sample("io", Duration::from_millis(1));
    check!(eventually(|| sink.lines().len() >= 2));
    check!(sink.drain()[0] == "elapsed time: 0s");

    // the loop reads "now" from whichever source is installed when it reports
    let after = ManuallyAdvancedTimeSource::at_instant(epoch_start.as_std());
    after.advance(Duration::from_secs(3600));
    profiler.set_time_source(TimeSource::custom(after));
    profiler.add_cumulative_sample("io", Duration::from_millis(1));
    check!(eventually(|| sink.lines().len() >= 2));
    profiler.stop(Mode::Cumulative);

    check!(sink.lines()[0] == "elapsed time: 3600s");
}

#[test]
fn zero_interval_loop_still_reports() {
    let (profiler, sink) = profiler_with_sink(Duration::ZERO);
    check!(profiler.interval(Mode::Average) == MIN_INTERVAL);
    profiler.enable_averaging().unwrap();

    profiler.add_average_sample("fast", Duration::from_secs(1));
    check!(eventually(|| sink.lines().len() >= 2));
    check!(profiler.stop(Mode::Average));
    check!(sink.lines()[1] == "fast took 1s");
}

// Records when each report cycle writes its epoch line. Feeds a sample every few
// milliseconds so that every cycle has something to report.
struct Firings {
    profiler: Profiler,
    at: Arc<Mutex<Vec<Instant>>>,
    feeding: Arc<AtomicBool>,
    feeder: Option<thread::JoinHandle<()>>,
}

impl Firings {
    fn new(profiler: Profiler) -> Self {
        let at = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&at);
        profiler.set_epoch_format(
            move |_start: scopestat::Instant, _now: scopestat::Instant, _scale: DisplayScale| {
                recorded.lock().unwrap().push(Instant::now());
                String::new()
            },
        );

        let feeding = Arc::new(AtomicBool::new(true));
        let feeder = {
            let profiler = profiler.clone();
            let feeding = Arc::clone(&feeding);
            thread::spawn(move || {
                while feeding.load(Ordering::Relaxed) {
                    profiler.add_average_sample("tick", Duration::from_millis(1));
                    thread::sleep(Duration::from_millis(2));
                }
            })
        };
        Self {
            profiler,
            at,
            feeding,
            feeder: Some(feeder),
        }
    }

    fn count(&self) -> usize {
        self.at.lock().unwrap().len()
    }

    fn times(&self) -> Vec<Instant> {
        self.at.lock().unwrap().clone()
    }
}

impl Drop for Firings {
    fn drop(&mut self) {
        self.feeding.store(false, Ordering::Relaxed);
        if let Some(feeder) = self.feeder.take() {
            feeder.join().unwrap();
        }
        self.profiler.stop(Mode::Average);
    }
}

#[test]
fn interval_change_applies_to_the_next_sleep_only() {
    let (profiler, _sink) = profiler_with_sink(Duration::from_millis(600));
    let firings = Firings::new(profiler.clone());

    let enabled_at = Instant::now();
    profiler.enable_averaging().unwrap();
    // let the loop get into its first sleep before changing the interval
    thread::sleep(Duration::from_millis(150));
    profiler.set_interval(Mode::Average, Duration::from_millis(50));
    check!(profiler.interval(Mode::Average) == Duration::from_millis(50));

    check!(eventually(|| firings.count() >= 3));
    let times = firings.times();

    // the sleep in progress kept its 600ms
    check!(times[0].duration_since(enabled_at) >= Duration::from_millis(600));
    // later sleeps use the new, shorter interval
    let gap = times[2].duration_since(times[1]);
    check!(gap >= Duration::from_millis(50));
    check!(gap < Duration::from_millis(500));
}

#[test]
fn running_loop_does_not_keep_the_profiler_alive() {
    let sink = VecSink::new();
    let profiler = Profiler::builder()
        .sink(sink.clone())
        .interval(Mode::Cumulative, Duration::from_millis(10))
        .build();
    let marker = Arc::new(());
    let held = Arc::clone(&marker);
    profiler.set_epoch_format(
        move |_start: scopestat::Instant, _now: scopestat::Instant, _scale: DisplayScale| {
            format!("tick, {} holders", Arc::strong_count(&held))
        },
    );
    profiler.enable_cumulative().unwrap();
    profiler.add_cumulative_sample("last", Duration::from_millis(1));
    check!(eventually(|| sink.lines().len() >= 2));

    drop(profiler);
    check!(eventually(|| Arc::strong_count(&marker) == 1));
}
