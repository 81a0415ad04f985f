//! Precision-recall curves and their 101-point interpolation.

/// Number of recall levels used for interpolated precision (0.00, 0.01, ..., 1.00).
pub const NUM_RECALL_LEVELS: usize = 101;

/// Cumulative precision and recall along a ranked detection list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
}

impl PrecisionRecallCurve {
    /// Build the curve from match flags already sorted by descending confidence.
    ///
    /// `precision[k] = tp[k] / (tp[k] + fp[k] + eps)` and
    /// `recall[k] = tp[k] / num_positives`, where `tp`/`fp` are running counts.
    /// `num_positives` must be non-zero.
    ///
    /// # Example
    ///
    /// ```
    /// use coco_stream_eval::metrics::precision_recall::PrecisionRecallCurve;
    ///
    /// let curve = PrecisionRecallCurve::from_ranked_matches(&[true, false, true], 4);
    /// assert_eq!(curve.recall, vec![0.25, 0.25, 0.5]);
    /// assert!((curve.precision[1] - 0.5).abs() < 1e-12);
    /// ```
    pub fn from_ranked_matches(matched: &[bool], num_positives: usize) -> Self {
        let mut precision = Vec::with_capacity(matched.len());
        let mut recall = Vec::with_capacity(matched.len());
        let mut tp = 0usize;
        let mut fp = 0usize;

        for &is_tp in matched {
            if is_tp {
                tp += 1;
            } else {
                fp += 1;
            }
            precision.push(tp as f64 / (tp as f64 + fp as f64 + f64::EPSILON));
            recall.push(tp as f64 / num_positives as f64);
        }

        Self { precision, recall }
    }

    /// Recall at the end of the list, 0.0 for an empty curve.
    pub fn final_recall(&self) -> f64 {
        self.recall.last().copied().unwrap_or(0.0)
    }

    /// Interpolated precision at the standard recall levels.
    pub fn interpolated(&self) -> Vec<f64> {
        interpolate_precision(&precision_envelope(&self.precision), &self.recall)
    }
}

/// The standard recall levels, generated as `i * 0.01` with the last pinned to 1.0.
pub fn recall_levels() -> Vec<f64> {
    let mut levels: Vec<f64> = (0..NUM_RECALL_LEVELS).map(|i| i as f64 * 0.01).collect();
    levels[NUM_RECALL_LEVELS - 1] = 1.0;
    levels
}

/// Make precision non-increasing by taking the running maximum from the right.
///
/// # Example
///
/// ```
/// use coco_stream_eval::metrics::precision_recall::precision_envelope;
///
/// assert_eq!(precision_envelope(&[1.0, 0.5, 0.67, 0.4]), vec![1.0, 0.67, 0.67, 0.4]);
/// ```
pub fn precision_envelope(precision: &[f64]) -> Vec<f64> {
    let mut envelope = precision.to_vec();
    for i in (0..envelope.len().saturating_sub(1)).rev() {
        envelope[i] = envelope[i].max(envelope[i + 1]);
    }
    envelope
}

/// Sample `envelope` at the standard recall levels.
///
/// For each level the first curve point with `recall >= level` is used; levels
/// beyond the final recall get 0.0. `recall` must be non-decreasing.
pub fn interpolate_precision(envelope: &[f64], recall: &[f64]) -> Vec<f64> {
    recall_levels()
        .into_iter()
        .map(|level| {
            let idx = recall.partition_point(|&r| r < level);
            envelope.get(idx).copied().unwrap_or(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_levels() {
        let levels = recall_levels();
        assert_eq!(levels.len(), 101);
        assert_eq!(levels[0], 0.0);
        assert_eq!(levels[100], 1.0);
        assert!((levels[37] - 0.37).abs() < 1e-12);
    }

    #[test]
    fn test_curve_values() {
        let curve = PrecisionRecallCurve::from_ranked_matches(&[true, true, false, true, false], 4);
        assert_eq!(curve.precision.len(), 5);
        assert!((curve.precision[0] - 1.0).abs() < 1e-10);
        assert!((curve.precision[2] - 2.0 / 3.0).abs() < 1e-10);
        assert!((curve.recall[0] - 0.25).abs() < 1e-10);
        assert!((curve.final_recall() - 0.75).abs() < 1e-10);
    }

    #[test]
    fn test_all_false_positives() {
        let curve = PrecisionRecallCurve::from_ranked_matches(&[false, false], 3);
        assert_eq!(curve.precision, vec![0.0, 0.0]);
        assert_eq!(curve.final_recall(), 0.0);
        assert!(curve.interpolated().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_envelope_is_non_increasing() {
        let envelope = precision_envelope(&[0.2, 1.0, 0.5, 0.75, 0.1]);
        assert_eq!(envelope, vec![1.0, 1.0, 0.75, 0.75, 0.1]);
        assert!(precision_envelope(&[]).is_empty());
    }

    #[test]
    fn test_interpolation_uses_first_point_reaching_level() {
        // recall 0.5 reached at index 1, 1.0 never reached
        let envelope = vec![1.0, 0.8];
        let recall = vec![0.25, 0.5];
        let interpolated = interpolate_precision(&envelope, &recall);
        assert_eq!(interpolated.len(), 101);
        assert_eq!(interpolated[0], 1.0);
        assert_eq!(interpolated[25], 1.0);
        assert_eq!(interpolated[26], 0.8);
        assert_eq!(interpolated[50], 0.8);
        assert_eq!(interpolated[51], 0.0);
        assert_eq!(interpolated[100], 0.0);
    }
}
