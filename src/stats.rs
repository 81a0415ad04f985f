/// Ingestion counters for a metric instance
///
/// Tracks how much data went through `update` since the last reset. The counters
/// are informational and never influence the computed scores.

use serde::{Deserialize, Serialize};

/// Counters collected while feeding batches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalStats {
    /// Number of images processed
    pub images: usize,

    /// Number of detections seen, before max-detections truncation
    pub detections: usize,

    /// Number of ground truths seen
    pub ground_truths: usize,

    /// Number of (image, class) pairs evaluated
    pub class_evaluations: usize,

    /// Number of images without any detection
    pub images_without_detections: usize,

    /// Number of `update` calls
    pub batches: usize,
}

impl EvalStats {
    /// Create a new `EvalStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one image and the number of classes it was split into
    pub fn record_image(&mut self, detections: usize, ground_truths: usize, classes: usize) {
        self.images += 1;
        self.detections += detections;
        self.ground_truths += ground_truths;
        self.class_evaluations += classes;
        if detections == 0 {
            self.images_without_detections += 1;
        }
    }

    /// Record one completed batch
    pub fn record_batch(&mut self) {
        self.batches += 1;
    }

    /// Add another instance's counters, used when merging shards
    pub fn absorb(&mut self, other: &EvalStats) {
        self.images += other.images;
        self.detections += other.detections;
        self.ground_truths += other.ground_truths;
        self.class_evaluations += other.class_evaluations;
        self.images_without_detections += other.images_without_detections;
        self.batches += other.batches;
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "EvalStats {{ batches: {}, images: {}, detections: {}, ground_truths: {}, class_evaluations: {}, empty: {} }}",
            self.batches,
            self.images,
            self.detections,
            self.ground_truths,
            self.class_evaluations,
            self.images_without_detections
        )
    }
}
