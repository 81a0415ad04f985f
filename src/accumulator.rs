//! Cross-batch accumulation of per-image matching results.
//!
//! State is kept per class label as one [`KeyStatistics`] per grid key. Merging two
//! accumulators concatenates those lists, which is how shards evaluated by
//! independent workers are combined before a single curve computation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::matching::{ImageClassEvaluation, KeyContribution};
use crate::threshold::{GridKey, ThresholdGrid};

/// Accumulated matching results of one class under one grid key.
///
/// `scores` and `matched` always have the same length. `positive_counts` holds one
/// entry per contributing image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    pub scores: Vec<f64>,
    pub matched: Vec<bool>,
    pub positive_counts: Vec<usize>,
}

impl KeyStatistics {
    /// Total number of non-ignored ground truths seen for this key.
    pub fn total_positives(&self) -> usize {
        self.positive_counts.iter().sum()
    }

    fn append(&mut self, contribution: &KeyContribution) {
        self.scores.extend_from_slice(&contribution.scores);
        self.matched.extend_from_slice(&contribution.matched);
        self.positive_counts.push(contribution.positives);
    }

    fn extend(&mut self, other: KeyStatistics) {
        self.scores.extend(other.scores);
        self.matched.extend(other.matched);
        self.positive_counts.extend(other.positive_counts);
    }
}

/// All grid keys of one class, indexed by [`ThresholdGrid::key_index`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    keys: Vec<KeyStatistics>,
}

impl ClassStatistics {
    fn new(num_keys: usize) -> Self {
        Self {
            keys: vec![KeyStatistics::default(); num_keys],
        }
    }

    pub fn keys(&self) -> &[KeyStatistics] {
        &self.keys
    }
}

/// Resettable per-class store fed by `update` and read by `compute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAccumulator {
    grid: ThresholdGrid,
    classes: BTreeMap<u64, ClassStatistics>,
}

impl ClassAccumulator {
    /// Create an empty accumulator for `grid`.
    pub fn new(grid: ThresholdGrid) -> Self {
        Self {
            grid,
            classes: BTreeMap::new(),
        }
    }

    pub fn grid(&self) -> &ThresholdGrid {
        &self.grid
    }

    /// Drop every accumulated class. Safe to call at any time, repeatedly.
    pub fn reset(&mut self) {
        self.classes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class labels seen so far, ascending.
    pub fn class_ids(&self) -> Vec<u64> {
        self.classes.keys().copied().collect()
    }

    /// Iterate classes in ascending label order.
    pub fn classes(&self) -> impl Iterator<Item = (u64, &ClassStatistics)> {
        self.classes.iter().map(|(&id, stats)| (id, stats))
    }

    /// Statistics of one class under one key.
    pub fn key_statistics(&self, class_id: u64, key: GridKey) -> Option<&KeyStatistics> {
        self.classes
            .get(&class_id)
            .and_then(|stats| stats.keys.get(self.grid.key_index(key)))
    }

    /// Append one image's evaluation of `class_id`.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the evaluation was produced for a grid with a
    /// different number of keys.
    pub fn append(&mut self, class_id: u64, evaluation: &ImageClassEvaluation) -> Result<()> {
        let num_keys = self.grid.num_keys();
        if evaluation.keys.len() != num_keys {
            return Err(EvalError::ShapeMismatch(format!(
                "image evaluation has {} keys, accumulator grid has {}",
                evaluation.keys.len(),
                num_keys
            )));
        }

        let stats = self
            .classes
            .entry(class_id)
            .or_insert_with(|| ClassStatistics::new(num_keys));
        for (acc, contribution) in stats.keys.iter_mut().zip(&evaluation.keys) {
            acc.append(contribution);
        }
        Ok(())
    }

    /// Fold another accumulator's state into this one.
    ///
    /// Lists are concatenated with `other` after `self`. Merging is associative,
    /// and the final scores do not depend on merge order beyond the relative order
    /// of equal-confidence detections.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the two accumulators use different grids.
    pub fn merge(&mut self, other: ClassAccumulator) -> Result<()> {
        if self.grid != other.grid {
            return Err(EvalError::Configuration(
                "cannot merge accumulators built on different threshold grids".to_string(),
            ));
        }

        let num_keys = self.grid.num_keys();
        for (class_id, other_stats) in other.classes {
            let stats = self
                .classes
                .entry(class_id)
                .or_insert_with(|| ClassStatistics::new(num_keys));
            for (acc, key_stats) in stats.keys.iter_mut().zip(other_stats.keys) {
                acc.extend(key_stats);
            }
        }
        Ok(())
    }

    /// Serialize the accumulated state, e.g. to ship a worker shard.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore state written by [`ClassAccumulator::to_json`].
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed input or an invalid grid, and `ShapeMismatch`
    /// if any class has the wrong number of keys or unequal `scores`/`matched`
    /// lengths.
    pub fn from_json(json: &str) -> Result<Self> {
        let acc: ClassAccumulator = serde_json::from_str(json)?;

        let num_keys = acc.grid.num_keys();
        for (class_id, stats) in &acc.classes {
            if stats.keys.len() != num_keys {
                return Err(EvalError::ShapeMismatch(format!(
                    "class {} has {} keys, grid has {}",
                    class_id,
                    stats.keys.len(),
                    num_keys
                )));
            }
            if stats.keys.iter().any(|k| k.scores.len() != k.matched.len()) {
                return Err(EvalError::ShapeMismatch(format!(
                    "class {} has scores and matched lists of different lengths",
                    class_id
                )));
            }
        }
        Ok(acc)
    }
}
