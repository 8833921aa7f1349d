//! Concurrent time-ordered sample store
//!
//! Samples are keyed by `(timestamp_ms, sequence)` so that a tail scan from a
//! cutoff timestamp is a logarithmic seek followed by a walk over the window.

use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Store key: arrival time in epoch milliseconds, then a tie-breaking sequence
pub type SampleKey = (i64, u64);

/// Running totals over a tail of the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowTotals {
    pub sum: i128,
    pub count: u64,
}

impl WindowTotals {
    /// Arithmetic mean, or 0.0 for an empty window
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// Ordered map from sample key to sample value
///
/// Internally synchronized: writers hold the lock for a single insert and
/// readers share it, so every completed insert is visible to later scans.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: RwLock<BTreeMap<SampleKey, i32>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample, replacing any value already stored under `key`
    pub fn insert(&self, key: SampleKey, value: i32) {
        self.samples.write().insert(key, value);
    }

    /// Sum and count every sample with timestamp >= `cutoff_ms`
    pub fn window_totals(&self, cutoff_ms: i64) -> WindowTotals {
        let samples = self.samples.read();
        samples
            .range((cutoff_ms, 0u64)..)
            .fold(WindowTotals::default(), |mut totals, (_, &value)| {
                totals.sum += i128::from(value);
                totals.count += 1;
                totals
            })
    }

    /// Remove every sample with timestamp < `cutoff_ms`, returning how many went
    pub fn prune_before(&self, cutoff_ms: i64) -> usize {
        let mut samples = self.samples.write();
        let kept = samples.split_off(&(cutoff_ms, 0u64));
        let removed = samples.len();
        *samples = kept;
        removed
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }
}
