//! Lock-free per-file progress tracking for one upload invocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-invocation map from file slot to upload percentage.
///
/// One slot per submitted file, updated concurrently from per-file progress
/// callbacks. Percentages are stored as `f64` bits in atomics; slots start
/// at 0 and are clamped to [0, 100]. The tracker belongs to exactly one
/// `upload()` call and is dropped when that call settles.
pub struct ProgressTracker {
    slots: Vec<AtomicU64>,
}

impl ProgressTracker {
    /// Create a tracker with one zeroed slot per file.
    pub fn new(files: usize) -> Self {
        Self {
            slots: (0..files).map(|_| AtomicU64::new(0u64)).collect(),
        }
    }

    /// Record a file's current percentage. Out-of-range slots are ignored.
    pub fn set(&self, index: usize, percent: f64) {
        if let Some(slot) = self.slots.get(index) {
            slot.store(percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed);
        }
    }

    /// Force a file's slot to 100, whether or not a final progress event
    /// ever fired for it.
    pub fn complete(&self, index: usize) {
        self.set(index, 100.0);
    }

    /// Mean of all tracked percentages, rounded to the nearest integer.
    /// An empty tracker aggregates to 0.
    pub fn aggregate(&self) -> u8 {
        if self.slots.is_empty() {
            return 0;
        }

        let total: f64 = self
            .slots
            .iter()
            .map(|slot| f64::from_bits(slot.load(Ordering::Relaxed)))
            .sum();

        (total / self.slots.len() as f64).round() as u8
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
