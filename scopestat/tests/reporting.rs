// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{io, time::Duration};

use assert2::{check, let_assert};
use rstest::rstest;
use scopestat::{
    DisplayScale, DisplayUnit, Instant, Mode, Profiler, TimeSource,
    format::Colon,
    sink::{Sink, VecSink},
};
use scopestat_timesource::fakes::ManuallyAdvancedTimeSource;

fn fake_profiler(unit: DisplayUnit) -> (Profiler, ManuallyAdvancedTimeSource, VecSink) {
    let clock = ManuallyAdvancedTimeSource::new();
    let sink = VecSink::new();
    let profiler = Profiler::builder()
        .time_source(TimeSource::custom(clock.clone()))
        .display_unit(unit)
        .sink(sink.clone())
        .build();
    (profiler, clock, sink)
}

#[test]
fn scope_timer_writes_one_line_with_the_duration() {
    let (profiler, clock, sink) = fake_profiler(DisplayUnit::Milliseconds);
    {
        let _t = profiler.scope_timer("scope timer");
        clock.advance(Duration::from_millis(500));
    }
    check!(sink.lines() == ["scope timer took 500ms"]);
}

#[test]
fn scope_timer_on_the_system_clock() {
    let sink = VecSink::new();
    let profiler = Profiler::builder()
        .display_unit(DisplayUnit::Milliseconds)
        .sink(sink.clone())
        .build();
    {
        let _t = profiler.scope_timer("scope timer");
        std::thread::sleep(Duration::from_millis(50));
    }

    let lines = sink.lines();
    check!(lines.len() == 1);
    let_assert!(Some(value) = lines[0].strip_prefix("scope timer took "));
    let_assert!(Some(value) = value.strip_suffix("ms"));
    let_assert!(Ok(millis) = value.parse::<f64>());
    check!(millis >= 50.0);
}

#[test]
fn average_report_then_nothing_until_new_samples() {
    let (profiler, clock, sink) = fake_profiler(DisplayUnit::Milliseconds);
    profiler.set_epoch_start_now();
    for _ in 0..20 {
        let _t = profiler.average_timer("avg timer");
        clock.advance(Duration::from_millis(100));
    }

    check!(profiler.log_averages() == 1);
    check!(sink.drain() == ["elapsed time: 2000ms", "avg timer took 100ms"]);

    check!(profiler.log_averages() == 0);
    check!(sink.lines().is_empty());
}

#[test]
fn cumulative_report_sums_and_resets() {
    let (profiler, clock, sink) = fake_profiler(DisplayUnit::Seconds);
    profiler.set_epoch_start_now();
    for secs in [1, 2, 3] {
        let _t = profiler.cumulative_timer("io");
        clock.advance(Duration::from_secs(secs));
    }

    check!(profiler.log_cumulative() == 1);
    check!(sink.drain() == ["elapsed time: 6s", "io (cumulative) took 6s"]);
    check!(profiler.drain_cumulative().is_empty());
}

#[rstest]
#[case(DisplayUnit::Nanoseconds, "1.5e+06ns")]
#[case(DisplayUnit::Microseconds, "1500us")]
#[case(DisplayUnit::Milliseconds, "1.5ms")]
#[case(DisplayUnit::Seconds, "0.0015s")]
fn display_unit_controls_rendering(#[case] unit: DisplayUnit, #[case] expected: &str) {
    let (profiler, _clock, sink) = fake_profiler(DisplayUnit::Seconds);
    profiler.set_display_unit(unit);
    profiler.log_duration("x", Duration::from_micros(1500));
    check!(sink.lines() == [format!("x took {expected}")]);
}

#[test]
fn unknown_scale_renders_placeholder_suffix() {
    let (profiler, _clock, sink) = fake_profiler(DisplayUnit::Seconds);
    profiler.set_display_scale(DisplayScale::custom(2.0));
    profiler.log_duration("x", Duration::from_secs(3));
    check!(sink.lines() == ["x took 6?"]);
}

#[test]
fn swapping_the_sink_redirects_later_reports_only() {
    let (profiler, _clock, before) = fake_profiler(DisplayUnit::Milliseconds);
    profiler.log_duration("first", Duration::from_millis(1));

    let after = VecSink::new();
    profiler.set_sink(after.clone());
    profiler.log_duration("second", Duration::from_millis(2));

    check!(before.lines() == ["first took 1ms"]);
    check!(after.lines() == ["second took 2ms"]);
}

#[test]
fn formatters_can_be_replaced_at_runtime() {
    let (profiler, clock, sink) = fake_profiler(DisplayUnit::Milliseconds);
    profiler.set_epoch_start_now();
    profiler.set_value_format(Colon);
    let epoch_start = profiler.epoch_start().unwrap();
    profiler.set_epoch_format(move |start: Instant, now: Instant, scale: DisplayScale| {
        check!(start == epoch_start);
        format!("period so far: {}", scale.render(now.saturating_duration_since(start)))
    });
    profiler.add_average_sample("db", Duration::from_millis(8));
    clock.advance(Duration::from_millis(40));

    profiler.report_now(Mode::Average);
    check!(sink.lines() == ["period so far: 40ms", "db: 8ms"]);
}

#[test]
fn time_source_swap_applies_to_new_measurements() {
    let (profiler, _clock, sink) = fake_profiler(DisplayUnit::Milliseconds);
    let other = ManuallyAdvancedTimeSource::new();
    profiler.set_time_source(TimeSource::custom(other.clone()));
    profiler.time_scope("after swap", || other.advance(Duration::from_millis(7)));
    check!(sink.lines() == ["after swap took 7ms"]);
}

#[derive(Debug)]
struct Failed;

fn validate(fail: bool) -> Result<(), Failed> {
    if fail { Err(Failed) } else { Ok(()) }
}

fn fallible(profiler: &Profiler, clock: &ManuallyAdvancedTimeSource, fail: bool) -> Result<u32, Failed> {
    let _t = profiler.average_timer("fallible");
    clock.advance(Duration::from_millis(10));
    validate(fail)?;
    clock.advance(Duration::from_millis(10));
    Ok(1)
}

fn early_return(profiler: &Profiler, clock: &ManuallyAdvancedTimeSource, bail: bool) -> u32 {
    let _t = profiler.cumulative_timer("early");
    clock.advance(Duration::from_millis(5));
    if bail {
        return 0;
    }
    clock.advance(Duration::from_millis(5));
    1
}

#[test]
fn guards_fire_on_every_exit_path() {
    let (profiler, clock, _sink) = fake_profiler(DisplayUnit::Milliseconds);

    let_assert!(Err(Failed) = fallible(&profiler, &clock, true));
    let_assert!(Ok(1) = fallible(&profiler, &clock, false));
    check!(profiler.drain_averages().get("fallible") == Some(&Duration::from_millis(15)));

    check!(early_return(&profiler, &clock, true) == 0);
    check!(early_return(&profiler, &clock, false) == 1);
    check!(
        profiler.drain_cumulative().get("early (cumulative)") == Some(&Duration::from_millis(15))
    );
}

#[test]
fn guard_fires_during_unwinding() {
    let (profiler, clock, sink) = fake_profiler(DisplayUnit::Milliseconds);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _t = profiler.scope_timer("panicking");
        clock.advance(Duration::from_millis(3));
        panic!("boom");
    }));
    check!(result.is_err());
    check!(sink.lines() == ["panicking took 3ms"]);
}

struct BrokenSink;

impl Sink for BrokenSink {
    fn write_line(&self, _line: &str) -> io::Result<()> {
        Err(io::Error::other("broken pipe"))
    }
}

#[test]
fn sink_errors_do_not_fail_reports() {
    let (profiler, _clock, _sink) = fake_profiler(DisplayUnit::Milliseconds);
    profiler.set_sink(BrokenSink);
    profiler.add_average_sample("lost", Duration::from_millis(1));
    check!(profiler.log_averages() == 1);
    check!(profiler.drain_averages().is_empty());
}

#[test]
fn concurrent_inserts_are_never_lost() {
    const THREADS: u64 = 64;
    const PER_THREAD: u64 = 1_000;

    let profiler = Profiler::builder().sink(VecSink::new()).build();
    let mut total = Duration::ZERO;
    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            let profiler = &profiler;
            scope.spawn(move || {
                for _ in 0..PER_THREAD {
                    profiler.add_cumulative_sample("race", Duration::from_millis(1));
                    profiler.add_average_sample("race", Duration::from_millis(4));
                }
            });
        }
        // drain while the writers are still going
        for _ in 0..100 {
            if let Some(sum) = profiler.drain_cumulative().get("race (cumulative)") {
                total += *sum;
            }
            let averages = profiler.drain_averages();
            if let Some(mean) = averages.get("race") {
                check!(*mean == Duration::from_millis(4));
            }
        }
    });
    if let Some(sum) = profiler.drain_cumulative().get("race (cumulative)") {
        total += *sum;
    }

    check!(total == Duration::from_millis(THREADS * PER_THREAD));
}
