//! Result matrices and the filtering/summary queries over them.

use ndarray::{Array3, Array4, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::metrics::ap::{calculate_map, UNDEFINED};
use crate::threshold::{AreaRange, ThresholdGrid};

/// `[iou_threshold, area_range, max_detections, class]` array of AP or AR values.
///
/// Entries are in `[0, 1]`, or `-1` where the class has no positives.
pub type ResultMatrix = Array4<f64>;

/// Tolerance used when looking up an IoU threshold by value.
const IOU_TOLERANCE: f64 = 1e-6;

/// Which of the two result matrices to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Precision,
    Recall,
}

/// Slice selection over the first three axes. `None` keeps the whole axis.
///
/// # Example
///
/// ```
/// use coco_stream_eval::results::ResultFilter;
/// use coco_stream_eval::threshold::AreaRange;
///
/// let filter = ResultFilter::new().iou(0.5).area(AreaRange::All).max_dets(100);
/// assert_eq!(filter.max_dets, Some(100));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultFilter {
    pub iou: Option<f64>,
    pub area: Option<AreaRange>,
    pub max_dets: Option<usize>,
}

impl ResultFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iou(mut self, iou: f64) -> Self {
        self.iou = Some(iou);
        self
    }

    pub fn area(mut self, area: AreaRange) -> Self {
        self.area = Some(area);
        self
    }

    pub fn max_dets(mut self, max_dets: usize) -> Self {
        self.max_dets = Some(max_dets);
        self
    }
}

/// How [`MetricResults::summarize`] reduces a filtered slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// Average over IoU thresholds, then over every remaining defined entry.
    Mean,
    /// Average over IoU thresholds and return the per-class vector at the first
    /// remaining area range and max-detections value.
    PerClass { clamp_negative: bool },
}

/// Output of [`MetricResults::summarize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Mean(f64),
    PerClass(Vec<f64>),
}

/// The standard COCO summary figures.
///
/// A figure whose slice is absent from the grid, or which has no defined
/// entries, is `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub map: f64,
    pub ap50: f64,
    pub ap75: f64,
    pub ap_small: f64,
    pub ap_medium: f64,
    pub ap_large: f64,
    pub ar_1: f64,
    pub ar_10: f64,
    /// AR at the largest max-detections value of the grid (100 by default).
    pub ar_100: f64,
    pub ar_small: f64,
    pub ar_medium: f64,
    pub ar_large: f64,
}

/// Precision and recall matrices for every class seen, with their grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResults {
    grid: ThresholdGrid,
    class_ids: Vec<u64>,
    precision: ResultMatrix,
    recall: ResultMatrix,
}

impl MetricResults {
    /// Bundle computed matrices.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` unless both matrices have shape
    /// `[ious, areas, max_dets, class_ids.len()]` for `grid`.
    pub fn new(
        grid: ThresholdGrid,
        class_ids: Vec<u64>,
        precision: ResultMatrix,
        recall: ResultMatrix,
    ) -> Result<Self> {
        let expected = (
            grid.iou_thresholds().len(),
            grid.area_ranges().len(),
            grid.max_detections().len(),
            class_ids.len(),
        );
        if precision.dim() != expected || recall.dim() != expected {
            return Err(EvalError::ShapeMismatch(format!(
                "result matrices must have shape {:?}, got {:?} and {:?}",
                expected,
                precision.dim(),
                recall.dim()
            )));
        }
        Ok(Self {
            grid,
            class_ids,
            precision,
            recall,
        })
    }

    pub fn grid(&self) -> &ThresholdGrid {
        &self.grid
    }

    /// Class labels along the last axis, ascending.
    pub fn class_ids(&self) -> &[u64] {
        &self.class_ids
    }

    pub fn precision(&self) -> &ResultMatrix {
        &self.precision
    }

    pub fn recall(&self) -> &ResultMatrix {
        &self.recall
    }

    pub fn matrix(&self, metric: Metric) -> &ResultMatrix {
        match metric {
            Metric::Precision => &self.precision,
            Metric::Recall => &self.recall,
        }
    }

    /// Select the sub-array matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` if a requested IoU threshold, area range, or
    /// max-detections value is not part of the grid.
    pub fn filter(&self, metric: Metric, filter: &ResultFilter) -> Result<ResultMatrix> {
        let grid = &self.grid;

        let iou_idx = select(grid.iou_thresholds(), filter.iou, |t, want| {
            (t - want).abs() < IOU_TOLERANCE
        })
        .ok_or_else(|| invalid_filter("IoU threshold", filter.iou))?;
        let area_idx = select(grid.area_ranges(), filter.area, |a, want| *a == want)
            .ok_or_else(|| invalid_filter("area range", filter.area))?;
        let dets_idx = select(grid.max_detections(), filter.max_dets, |m, want| *m == want)
            .ok_or_else(|| invalid_filter("max detections", filter.max_dets))?;

        Ok(self
            .matrix(metric)
            .select(Axis(0), &iou_idx)
            .select(Axis(1), &area_idx)
            .select(Axis(2), &dets_idx))
    }

    /// Reduce a filtered slice to a mean or a per-class vector.
    ///
    /// Values are first averaged over the IoU axis. In [`SummaryKind::Mean`]
    /// mode undefined entries are left out of the average (and the result is
    /// `-1` if nothing is defined); in [`SummaryKind::PerClass`] mode undefined
    /// entries are optionally clamped to 0.
    pub fn summarize(
        &self,
        metric: Metric,
        filter: &ResultFilter,
        kind: SummaryKind,
    ) -> Result<Summary> {
        match kind {
            SummaryKind::Mean => self.mean(metric, filter).map(Summary::Mean),
            SummaryKind::PerClass { clamp_negative } => self
                .per_class(metric, filter, clamp_negative)
                .map(Summary::PerClass),
        }
    }

    /// Mean over the filtered slice, excluding undefined entries.
    pub fn mean(&self, metric: Metric, filter: &ResultFilter) -> Result<f64> {
        let per_iou = self.averaged_over_iou(metric, filter)?;
        let values: Vec<f64> = per_iou.iter().copied().collect();
        Ok(calculate_map(&values))
    }

    /// Per-class values at the first area range and max-detections value left
    /// by the filter.
    pub fn per_class(
        &self,
        metric: Metric,
        filter: &ResultFilter,
        clamp_negative: bool,
    ) -> Result<Vec<f64>> {
        let per_iou = self.averaged_over_iou(metric, filter)?;
        let per_class = per_iou.index_axis(Axis(0), 0).index_axis(Axis(0), 0).to_vec();
        if clamp_negative {
            Ok(per_class.into_iter().map(|v| v.max(0.0)).collect())
        } else {
            Ok(per_class)
        }
    }

    fn averaged_over_iou(&self, metric: Metric, filter: &ResultFilter) -> Result<Array3<f64>> {
        self.filter(metric, filter)?
            .mean_axis(Axis(0))
            .ok_or_else(|| invalid_filter("IoU threshold", filter.iou))
    }

    /// The twelve standard COCO figures.
    ///
    /// AP figures, `ar_100`, and the AR figures by size use the largest
    /// max-detections value of the grid.
    pub fn summary(&self) -> DetectionSummary {
        let top = self.grid.max_detections().last().copied().unwrap_or(100);
        let all = ResultFilter::new().area(AreaRange::All);
        let ap = |filter: ResultFilter| self.mean(Metric::Precision, &filter).unwrap_or(UNDEFINED);
        let ar = |filter: ResultFilter| self.mean(Metric::Recall, &filter).unwrap_or(UNDEFINED);

        DetectionSummary {
            map: ap(all.max_dets(top)),
            ap50: ap(all.max_dets(top).iou(0.5)),
            ap75: ap(all.max_dets(top).iou(0.75)),
            ap_small: ap(ResultFilter::new().area(AreaRange::Small).max_dets(top)),
            ap_medium: ap(ResultFilter::new().area(AreaRange::Medium).max_dets(top)),
            ap_large: ap(ResultFilter::new().area(AreaRange::Large).max_dets(top)),
            ar_1: ar(all.max_dets(1)),
            ar_10: ar(all.max_dets(10)),
            ar_100: ar(all.max_dets(top)),
            ar_small: ar(ResultFilter::new().area(AreaRange::Small).max_dets(top)),
            ar_medium: ar(ResultFilter::new().area(AreaRange::Medium).max_dets(top)),
            ar_large: ar(ResultFilter::new().area(AreaRange::Large).max_dets(top)),
        }
    }

    /// Serialize the results to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Indices along one axis: all of them, or those matching `wanted`.
/// `None` if a wanted value matches nothing.
fn select<T, W: Copy>(
    axis: &[T],
    wanted: Option<W>,
    matches: impl Fn(&T, W) -> bool,
) -> Option<Vec<usize>> {
    match wanted {
        None => Some((0..axis.len()).collect()),
        Some(want) => {
            let idx: Vec<usize> = axis
                .iter()
                .enumerate()
                .filter(|(_, value)| matches(*value, want))
                .map(|(i, _)| i)
                .collect();
            if idx.is_empty() {
                None
            } else {
                Some(idx)
            }
        }
    }
}

fn invalid_filter<V: std::fmt::Debug>(axis: &str, value: Option<V>) -> EvalError {
    EvalError::InvalidFilter(format!("{} {:?} is not part of the grid", axis, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn results() -> MetricResults {
        let grid = ThresholdGrid::new(
            vec![0.5, 0.75],
            vec![1, 100],
            (1024.0, 9216.0),
            vec![AreaRange::Small, AreaRange::All],
        )
        .unwrap();
        // class 0 is defined everywhere, class 1 has no positives
        let precision = Array::from_shape_fn((2, 2, 2, 2), |(t, a, m, k)| {
            if k == 1 {
                -1.0
            } else {
                0.1 * (1 + t) as f64 + 0.01 * a as f64 + 0.001 * m as f64
            }
        });
        let recall = precision.mapv(|v| if v < 0.0 { v } else { v + 0.5 });
        MetricResults::new(grid, vec![3, 8], precision, recall).unwrap()
    }

    #[test]
    fn test_new_checks_shape() {
        let grid = ThresholdGrid::default();
        let bad = Array4::<f64>::zeros((1, 1, 1, 1));
        assert!(matches!(
            MetricResults::new(grid, vec![1], bad.clone(), bad),
            Err(EvalError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_filter_keeps_unfiltered_axes() {
        let res = results();
        let all = res.filter(Metric::Precision, &ResultFilter::new()).unwrap();
        assert_eq!(all.dim(), (2, 2, 2, 2));

        let sliced = res
            .filter(Metric::Precision, &ResultFilter::new().iou(0.75).max_dets(100))
            .unwrap();
        assert_eq!(sliced.dim(), (1, 2, 1, 2));
        assert!((sliced[[0, 1, 0, 0]] - 0.211).abs() < 1e-12);
    }

    #[test]
    fn test_filter_unknown_value() {
        let res = results();
        assert!(matches!(
            res.filter(Metric::Recall, &ResultFilter::new().iou(0.6)),
            Err(EvalError::InvalidFilter(_))
        ));
        assert!(matches!(
            res.filter(Metric::Recall, &ResultFilter::new().area(AreaRange::Large)),
            Err(EvalError::InvalidFilter(_))
        ));
        assert!(matches!(
            res.filter(Metric::Recall, &ResultFilter::new().max_dets(10)),
            Err(EvalError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_mean_excludes_undefined_classes() {
        let res = results();
        let filter = ResultFilter::new().area(AreaRange::All).max_dets(100);
        let mean = res.mean(Metric::Precision, &filter).unwrap();
        // (0.111 + 0.211) / 2
        assert!((mean - 0.161).abs() < 1e-12);
    }

    #[test]
    fn test_per_class_clamps() {
        let res = results();
        let filter = ResultFilter::new().iou(0.5).area(AreaRange::Small).max_dets(1);
        let clamped = res.per_class(Metric::Recall, &filter, true).unwrap();
        assert_eq!(clamped.len(), 2);
        assert!((clamped[0] - 0.6).abs() < 1e-12);
        assert_eq!(clamped[1], 0.0);

        let raw = res.per_class(Metric::Recall, &filter, false).unwrap();
        assert_eq!(raw[1], -1.0);
    }

    #[test]
    fn test_summary_marks_missing_slices() {
        let res = results();
        let summary = res.summary();
        assert!((summary.ap50 - 0.111).abs() < 1e-12);
        assert!((summary.ap75 - 0.211).abs() < 1e-12);
        assert_eq!(summary.ap_medium, UNDEFINED);
        assert_eq!(summary.ar_10, UNDEFINED);
        assert!((summary.ar_1 - (0.61 + 0.71) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_json_contains_classes() {
        let json = results().to_json().unwrap();
        assert!(json.contains("\"class_ids\":[3,8]"));
    }
}
