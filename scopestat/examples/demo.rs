// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Walks through the scopestat features on the global profiler: a manual timer, a
//! scope timer, average reports logged by hand and by the background loop, then
//! runtime changes to the interval, clock, unit, formatters and sink.
//!
//! Run with `RUST_LOG=scopestat=info` to see the report loop's own logs on stderr.

use std::{sync::Arc, thread::sleep, time::Duration};

use scopestat::{
    DisplayUnit, Instant, Mode, TimeSource, Timer, average_timer, global, scope_timer,
    sink::{Sink, StdoutSink, WriterSink},
    unit::DisplayScale,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let profiler = global();

    // manual timer
    let timer = Timer::start(profiler);
    sleep(Duration::from_millis(200));
    let elapsed = timer.stop();
    println!("manual timer took: {}", profiler.scale().render(elapsed));

    println!("scope timer:");
    {
        scope_timer!("scope timer");
        sleep(Duration::from_millis(500));
    }

    println!("\naverage timer, manual logging:");
    profiler.set_epoch_start_now();
    for _ in 0..20 {
        average_timer!("avg timer");
        sleep(Duration::from_millis(100));
    }
    profiler.log_averages();

    println!("\naverage timer, automatic logging:");
    profiler.enable_averaging()?;
    for _ in 0..50 {
        average_timer!("avg timer");
        sleep(Duration::from_millis(100));
    }

    println!("\naverage timer, automatic logging, 500ms sleep:");
    profiler.set_interval(Mode::Average, Duration::from_millis(500));
    for _ in 0..30 {
        average_timer!("avg timer");
        sleep(Duration::from_millis(100));
    }

    profiler.set_time_source(TimeSource::wall_clock());
    profiler.set_display_unit(DisplayUnit::Minutes);
    profiler.set_value_format(|label: &str, d: Duration, scale: DisplayScale| {
        format!("(custom output) {label} took {}", scale.render(d))
    });
    profiler.set_epoch_format(|start: Instant, now: Instant, scale: DisplayScale| {
        let elapsed = now.saturating_duration_since(start);
        format!("(custom output) elapsed time: {}", scale.render(elapsed))
    });
    println!(
        "\naverage timer, automatic logging, 500ms sleep, minutes duration unit, custom output functions:"
    );
    for _ in 0..30 {
        average_timer!("avg timer");
        sleep(Duration::from_millis(100));
    }

    let path = std::env::temp_dir().join("scopestat-demo-output.txt");
    let file = Arc::new(WriterSink::file(&path)?);
    file.write_line(
        "average timer, automatic logging, 500ms sleep, minutes duration unit, custom output functions, output to file:",
    )?;
    profiler.set_sink(Arc::clone(&file));
    println!("\nchanged output stream to file, check {}", path.display());
    for _ in 0..30 {
        average_timer!("avg timer");
        sleep(Duration::from_millis(100));
    }

    profiler.stop(Mode::Average);
    // flushes the file
    profiler.set_sink(StdoutSink);
    Ok(())
}
