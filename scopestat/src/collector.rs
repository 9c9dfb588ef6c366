// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Label-keyed, thread-safe collection of duration samples.
//!
//! Each [`SampleCollector`] owns one sample set behind its own lock. Inserts append to
//! the list for their label. A drain swaps the whole set out under the lock, so every
//! insert lands in exactly one drain: either the one that swapped it out or a later one.

use std::{collections::BTreeMap, fmt, sync::Mutex, time::Duration};

use hashbrown::HashMap;

/// Appended to labels stored by the cumulative collector, so cumulative and average
/// reports for the same label never share a line.
pub const CUMULATIVE_SUFFIX: &str = " (cumulative)";

/// How a collector folds the samples of one label into the reported value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Arithmetic mean per label per period
    Average,
    /// Sum per label per period
    Cumulative,
}

impl Mode {
    /// Fold `samples` into a single duration. Returns `None` for an empty list.
    ///
    /// The mean truncates to whole nanoseconds; the sum saturates at [`Duration::MAX`].
    pub fn aggregate(self, samples: &[Duration]) -> Option<Duration> {
        if samples.is_empty() {
            return None;
        }
        match self {
            Self::Average => {
                let total: u128 = samples.iter().map(Duration::as_nanos).sum();
                Some(duration_from_nanos(total / samples.len() as u128))
            }
            Self::Cumulative => Some(
                samples
                    .iter()
                    .fold(Duration::ZERO, |acc, d| acc.saturating_add(*d)),
            ),
        }
    }

    /// The key samples for `label` are stored under in this mode
    pub fn storage_label(self, label: &str) -> String {
        match self {
            Self::Average => label.to_owned(),
            Self::Cumulative => format!("{label}{CUMULATIVE_SUFFIX}"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Average => f.write_str("average"),
            Self::Cumulative => f.write_str("cumulative"),
        }
    }
}

fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}

/// Thread-safe sample set for one [`Mode`]
pub struct SampleCollector {
    mode: Mode,
    samples: Mutex<HashMap<String, Vec<Duration>>>,
}

impl SampleCollector {
    /// Create an empty collector
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            samples: Mutex::default(),
        }
    }

    /// The aggregation mode of this collector
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Record one sample for `label`
    pub fn add(&self, label: &str, duration: Duration) {
        match self.mode {
            Mode::Average => {
                let mut samples = self.samples.lock().unwrap();
                samples.entry_ref(label).or_default().push(duration);
            }
            Mode::Cumulative => {
                let key = self.mode.storage_label(label);
                let mut samples = self.samples.lock().unwrap();
                samples.entry(key).or_default().push(duration);
            }
        }
    }

    /// Take every sample recorded since the last drain and fold each label's samples.
    ///
    /// Labels with no samples in the period are absent from the result. A second drain
    /// with no inserts in between returns an empty map.
    pub fn drain(&self) -> BTreeMap<String, Duration> {
        let taken = std::mem::take(&mut *self.samples.lock().unwrap());
        taken
            .into_iter()
            .filter_map(|(label, samples)| {
                self.mode
                    .aggregate(&samples)
                    .map(|aggregated| (label, aggregated))
            })
            .collect()
    }

    /// Number of labels with pending samples
    pub fn len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    /// True if no samples are pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SampleCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleCollector")
            .field("mode", &self.mode)
            .field("pending_labels", &self.len())
            .finish()
    }
}
