//! Streaming mAP / mAR metric: `reset`, `update`, `compute`.

use std::str::FromStr;

use log::{debug, trace};
use ndarray::Array4;

use crate::accumulator::ClassAccumulator;
use crate::error::{EvalError, Result};
use crate::matching::{evaluate_image, ImageClassEvaluation};
use crate::metrics::ap::{calculate_ap_recall, UNDEFINED};
use crate::results::{Metric, MetricResults, ResultFilter};
use crate::stats::EvalStats;
use crate::threshold::{AreaRange, ThresholdGrid};
use crate::types::{validate_image, Detection, GroundTruth, ImageRecord};

/// What [`AveragePrecision::compute`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeMode {
    /// Per-class AP, averaged over IoU thresholds.
    Precision,
    /// Per-class AR, averaged over IoU thresholds.
    Recall,
    /// Both result matrices, for later slicing.
    Full,
}

impl ComputeMode {
    /// Map the integer option style (`Some(0)`, `Some(1)`, `None`) to a mode.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMode` for any other integer.
    pub fn from_option(option: Option<u8>) -> Result<Self> {
        match option {
            Some(0) => Ok(ComputeMode::Precision),
            Some(1) => Ok(ComputeMode::Recall),
            None => Ok(ComputeMode::Full),
            Some(other) => Err(EvalError::UnsupportedMode(format!(
                "return option {} (expected 0, 1 or none)",
                other
            ))),
        }
    }

    /// Whether this mode reports a single figure per class.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ComputeMode::Full)
    }
}

impl FromStr for ComputeMode {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precision" | "ap" | "0" => Ok(ComputeMode::Precision),
            "recall" | "ar" | "1" => Ok(ComputeMode::Recall),
            "full" | "all" | "none" => Ok(ComputeMode::Full),
            other => Err(EvalError::UnsupportedMode(format!(
                "'{}' (expected precision, recall or full)",
                other
            ))),
        }
    }
}

/// Per-class figures reported by the scalar modes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    /// Class labels, ascending.
    pub class_ids: Vec<u64>,
    /// One value per class; classes without positives are reported as 0.
    pub values: Vec<f64>,
    /// Mean over classes that have positives, `-1` if none do.
    pub mean: f64,
}

/// Result of [`AveragePrecision::compute`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutput {
    Precision(ClassScores),
    Recall(ClassScores),
    Full(MetricResults),
}

/// COCO-style mean Average Precision / mean Average Recall over a stream of
/// images.
///
/// Feed batches with [`update`](AveragePrecision::update), read the figures
/// with [`compute`](AveragePrecision::compute), and start over with
/// [`reset`](AveragePrecision::reset). Instances fed from disjoint shards can
/// be combined with [`merge`](AveragePrecision::merge) before computing.
///
/// # Example
///
/// ```
/// use coco_stream_eval::evaluator::{AveragePrecision, ComputeMode, MetricOutput};
/// use coco_stream_eval::types::{BoundingBox, Detection, GroundTruth, ImageRecord};
///
/// let mut metric = AveragePrecision::new(ComputeMode::Precision);
/// let image = ImageRecord::new(
///     vec![Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 1)],
///     vec![GroundTruth::new(1, BoundingBox::new(0.0, 0.0, 10.0, 10.0))],
/// );
/// metric.update(&[image]).unwrap();
///
/// match metric.compute().unwrap() {
///     MetricOutput::Precision(scores) => assert!((scores.mean - 1.0).abs() < 1e-10),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AveragePrecision {
    mode: ComputeMode,
    accumulator: ClassAccumulator,
    stats: EvalStats,
}

impl AveragePrecision {
    /// Create a metric on the default COCO grid.
    ///
    /// Scalar modes only need the `all` area range and the largest
    /// max-detections value, so they use the collapsed grid.
    pub fn new(mode: ComputeMode) -> Self {
        let grid = ThresholdGrid::default();
        let grid = if mode.is_scalar() { grid.collapsed() } else { grid };
        Self::with_grid(grid, mode)
    }

    /// Create a metric on an explicit grid.
    pub fn with_grid(grid: ThresholdGrid, mode: ComputeMode) -> Self {
        Self {
            mode,
            accumulator: ClassAccumulator::new(grid),
            stats: EvalStats::new(),
        }
    }

    pub fn grid(&self) -> &ThresholdGrid {
        self.accumulator.grid()
    }

    pub fn mode(&self) -> ComputeMode {
        self.mode
    }

    pub fn stats(&self) -> &EvalStats {
        &self.stats
    }

    pub fn accumulator(&self) -> &ClassAccumulator {
        &self.accumulator
    }

    /// Clear all accumulated state and counters.
    pub fn reset(&mut self) {
        debug!("resetting metric after {}", self.stats.summary_string());
        self.accumulator.reset();
        self.stats.reset();
    }

    /// Add a batch of images.
    ///
    /// The whole batch is validated before any state changes, so a failing
    /// batch leaves the metric untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBoundingBox` or `ShapeMismatch` for malformed boxes or
    /// non-finite confidences.
    pub fn update(&mut self, batch: &[ImageRecord]) -> Result<()> {
        let images: Vec<(&[Detection], &[GroundTruth])> = batch
            .iter()
            .map(|image| (image.detections.as_slice(), image.ground_truths.as_slice()))
            .collect();
        self.ingest(&images)
    }

    /// Add a batch given as parallel prediction and ground-truth lists.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the two lists have different lengths, plus
    /// the errors of [`update`](AveragePrecision::update).
    pub fn update_pairs(
        &mut self,
        predictions: &[Vec<Detection>],
        ground_truths: &[Vec<GroundTruth>],
    ) -> Result<()> {
        check_batch_lengths(predictions.len(), ground_truths.len())?;
        let images: Vec<(&[Detection], &[GroundTruth])> = predictions
            .iter()
            .zip(ground_truths)
            .map(|(dets, gts)| (dets.as_slice(), gts.as_slice()))
            .collect();
        self.ingest(&images)
    }

    /// Add a batch of raw rows: detections as `[x, y, w, h, confidence, label]`,
    /// ground truths as `[label, x, y, w, h]`.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` for mismatched batch lengths or rows with the
    /// wrong field count, and `InvalidLabel`/`InvalidBoundingBox` for bad values.
    pub fn update_rows<D, G>(&mut self, predictions: &[Vec<D>], ground_truths: &[Vec<G>]) -> Result<()>
    where
        D: AsRef<[f64]>,
        G: AsRef<[f64]>,
    {
        check_batch_lengths(predictions.len(), ground_truths.len())?;
        let batch = predictions
            .iter()
            .zip(ground_truths)
            .map(|(dets, gts)| ImageRecord::from_rows(dets, gts))
            .collect::<Result<Vec<_>>>()?;
        self.update(&batch)
    }

    /// Fold another instance's state into this one.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the two instances use different grids.
    pub fn merge(&mut self, other: AveragePrecision) -> Result<()> {
        debug!(
            "merging shard with {} classes ({})",
            other.accumulator.num_classes(),
            other.stats.summary_string()
        );
        self.accumulator.merge(other.accumulator)?;
        self.stats.absorb(&other.stats);
        Ok(())
    }

    /// Compute in the mode chosen at construction.
    pub fn compute(&self) -> Result<MetricOutput> {
        self.compute_as(self.mode)
    }

    /// Compute in a mode given by name.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMode` if `mode` is not a known mode name.
    pub fn compute_named(&self, mode: &str) -> Result<MetricOutput> {
        self.compute_as(mode.parse()?)
    }

    /// Compute in an explicit mode.
    ///
    /// Scalar modes report per-class values at the `all` area range (the first
    /// range if the grid has no `all`) and the largest max-detections value,
    /// averaged over IoU thresholds.
    pub fn compute_as(&self, mode: ComputeMode) -> Result<MetricOutput> {
        let results = self.compute_results()?;
        match mode {
            ComputeMode::Full => Ok(MetricOutput::Full(results)),
            ComputeMode::Precision => {
                Ok(MetricOutput::Precision(self.class_scores(&results, Metric::Precision)?))
            }
            ComputeMode::Recall => {
                Ok(MetricOutput::Recall(self.class_scores(&results, Metric::Recall)?))
            }
        }
    }

    /// Reduce the accumulated state to precision and recall matrices.
    pub fn compute_results(&self) -> Result<MetricResults> {
        let grid = self.grid();
        let class_ids = self.accumulator.class_ids();
        let shape = (
            grid.iou_thresholds().len(),
            grid.area_ranges().len(),
            grid.max_detections().len(),
            class_ids.len(),
        );
        debug!(
            "computing {} classes over a {}x{}x{} grid",
            shape.3, shape.0, shape.1, shape.2
        );

        let mut precision = Array4::from_elem(shape, UNDEFINED);
        let mut recall = Array4::from_elem(shape, UNDEFINED);

        for (class_pos, (class_id, class_stats)) in self.accumulator.classes().enumerate() {
            for key in grid.keys() {
                let stats = &class_stats.keys()[grid.key_index(key)];
                let result =
                    calculate_ap_recall(&stats.scores, &stats.matched, stats.total_positives());
                trace!(
                    "class {} area={} max_dets={} iou={}: ap={:.4} ar={:.4}",
                    class_id,
                    grid.area_ranges()[key.area],
                    grid.max_detections()[key.max_dets],
                    grid.iou_thresholds()[key.iou],
                    result.precision,
                    result.recall
                );
                let idx = [key.iou, key.area, key.max_dets, class_pos];
                precision[idx] = result.precision;
                recall[idx] = result.recall;
            }
        }

        MetricResults::new(grid.clone(), class_ids, precision, recall)
    }

    fn class_scores(&self, results: &MetricResults, metric: Metric) -> Result<ClassScores> {
        let grid = self.grid();
        let area = if grid.area_ranges().contains(&AreaRange::All) {
            Some(AreaRange::All)
        } else {
            grid.area_ranges().first().copied()
        };
        let (area, max_dets) = area
            .zip(grid.max_detections().last().copied())
            .ok_or_else(|| {
                EvalError::Configuration("grid has no area range or max-detections value".to_string())
            })?;
        let filter = ResultFilter::new().area(area).max_dets(max_dets);

        Ok(ClassScores {
            class_ids: results.class_ids().to_vec(),
            values: results.per_class(metric, &filter, true)?,
            mean: results.mean(metric, &filter)?,
        })
    }

    fn ingest(&mut self, images: &[(&[Detection], &[GroundTruth])]) -> Result<()> {
        for (dets, gts) in images {
            validate_image(dets, gts)?;
        }

        let grid = self.accumulator.grid();
        let evaluations: Vec<std::collections::BTreeMap<u64, ImageClassEvaluation>> = images
            .iter()
            .map(|(dets, gts)| evaluate_image(grid, dets, gts))
            .collect();

        let mut batch_stats = EvalStats::new();
        for ((dets, gts), per_class) in images.iter().zip(&evaluations) {
            batch_stats.record_image(dets.len(), gts.len(), per_class.len());
        }
        for per_class in &evaluations {
            for (&class_id, evaluation) in per_class {
                self.accumulator.append(class_id, evaluation)?;
            }
        }
        batch_stats.record_batch();

        debug!(
            "update: {} images, {} detections, {} ground truths, {} class evaluations",
            batch_stats.images,
            batch_stats.detections,
            batch_stats.ground_truths,
            batch_stats.class_evaluations
        );
        self.stats.absorb(&batch_stats);
        Ok(())
    }
}

fn check_batch_lengths(predictions: usize, ground_truths: usize) -> Result<()> {
    if predictions != ground_truths {
        return Err(EvalError::ShapeMismatch(format!(
            "batch has {} prediction lists but {} ground-truth lists",
            predictions, ground_truths
        )));
    }
    Ok(())
}
