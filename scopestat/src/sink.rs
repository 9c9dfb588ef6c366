// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Destinations for formatted report lines.
//!
//! A [`Sink`] accepts one line of text at a time. Stream-backed sinks terminate each
//! line with `\n`. Errors returned by a sink never fail a report; the
//! [`Profiler`](crate::Profiler) logs them through [`tracing`] and moves on.

use std::{
    fs::File,
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::rate_limit::RateLimiter;

/// Pluggable output destination for report lines
pub trait Sink: Send + Sync {
    /// Write one line. `line` does not include a trailing newline.
    fn write_line(&self, line: &str) -> io::Result<()>;

    /// Flush anything buffered. Called once at the end of every report cycle.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes lines to the standard output stream. The default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Writes lines to the standard error stream
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = io::stderr().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }
}

/// Writes lines to any [`Write`] destination, such as a file
///
/// The writer is guarded by a mutex, so lines from concurrent reports never interleave.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap()
    }
}

impl WriterSink<io::BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write lines to it
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(io::BufWriter::new(file)))
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().unwrap().flush()
    }
}

/// In-memory sink backed by a [`Vec`]
///
/// Cloning will provide another reference to the same underlying lines, which makes it
/// convenient for asserting on report output.
///
/// # Example
/// ```
/// # use scopestat::sink::{Sink, VecSink};
/// let sink = VecSink::default();
/// sink.write_line("a took 1s").unwrap();
/// assert_eq!(sink.drain(), vec!["a took 1s".to_string()]);
/// assert!(sink.lines().is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct VecSink(Arc<Mutex<Vec<String>>>);

impl VecSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every line written so far
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Take every line written so far, leaving the sink empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl Sink for VecSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.0.lock().unwrap().push(line.to_owned());
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Write `line`, logging rather than propagating failures
pub(crate) fn write_or_log(sink: &dyn Sink, line: &str) -> bool {
    match sink.write_line(line) {
        Ok(()) => true,
        Err(err) => {
            static FAILURES: RateLimiter = RateLimiter::per_window(Duration::from_secs(60));
            if FAILURES.allow() {
                tracing::warn!(?err, "couldn't write report line to sink");
            }
            false
        }
    }
}

/// Flush `sink`, logging rather than propagating failures
pub(crate) fn flush_or_log(sink: &dyn Sink) {
    if let Err(err) = sink.flush() {
        static FAILURES: RateLimiter = RateLimiter::per_window(Duration::from_secs(60));
        if FAILURES.allow() {
            tracing::warn!(?err, "couldn't flush report sink");
        }
    }
}
