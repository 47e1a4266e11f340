//! Streaming statistics used by the aggregator

use std::collections::BTreeMap;

/// Frequency count of integer-rounded tempo candidates
#[derive(Debug, Clone, Default)]
pub struct TempoHistogram {
    counts: BTreeMap<i64, usize>,
}

impl TempoHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate. Non-finite and non-positive values are ignored.
    pub fn add(&mut self, bpm: f32) {
        if !bpm.is_finite() || bpm <= 0.0 {
            return;
        }
        let rounded = bpm.round() as i64;
        if rounded <= 0 {
            return;
        }
        *self.counts.entry(rounded).or_insert(0) += 1;
    }

    /// Total number of recorded candidates
    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Most frequent value. Ties go to the greatest value.
    pub fn mode(&self) -> Option<i64> {
        // BTreeMap iterates in ascending key order and max_by_key keeps the
        // last maximum, so the greatest tied value wins.
        self.counts
            .iter()
            .max_by_key(|&(_, &count)| count)
            .map(|(&value, _)| value)
    }
}

/// Mode of integer-rounded values (ties go to the greatest value)
pub fn mode(values: &[f32]) -> Option<i64> {
    let mut histogram = TempoHistogram::new();
    for &v in values {
        histogram.add(v);
    }
    histogram.mode()
}

/// Running arithmetic mean that reports 0 when empty
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample; non-finite samples are ignored
    pub fn add(&mut self, value: f32) {
        if value.is_finite() {
            self.sum += f64::from(value);
            self.count += 1;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64) as f32
        }
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f32]) -> f32 {
    let mut acc = RunningMean::new();
    for &v in values {
        acc.add(v);
    }
    acc.mean()
}
