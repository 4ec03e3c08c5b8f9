//! Fixed-capacity latency sample window.

use std::collections::VecDeque;

/// Default number of samples retained.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 60;

/// FIFO window of latency samples in milliseconds.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a sample, evicting the oldest once full. Non-finite values are dropped.
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Nearest-rank percentile: element at `floor(p/100 * n)`, clamped to the last index.
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let raw = (percentile / 100.0 * sorted.len() as f64).floor();
        let idx = if raw.is_sign_negative() { 0 } else { raw as usize };
        sorted.get(idx.min(sorted.len() - 1)).copied()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAPACITY)
    }
}
