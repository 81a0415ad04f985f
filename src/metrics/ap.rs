//! Average Precision (AP) and Average Recall (AR) per class and key.

use std::cmp::Ordering;

use crate::metrics::precision_recall::PrecisionRecallCurve;

/// Marks a result that is undefined because the class has no positives.
pub const UNDEFINED: f64 = -1.0;

/// AP and AR of one class under one grid key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApRecall {
    pub precision: f64,
    pub recall: f64,
}

impl ApRecall {
    /// Both values set to [`UNDEFINED`].
    pub const UNDEFINED: ApRecall = ApRecall {
        precision: UNDEFINED,
        recall: UNDEFINED,
    };

    pub fn is_defined(&self) -> bool {
        self.precision > UNDEFINED
    }
}

/// Compute AP (101-point interpolated) and AR for accumulated detections.
///
/// `scores` and `matched` are parallel lists in any order; they are re-ranked by
/// descending score, keeping the given order among equal scores. With zero
/// positives the result is [`ApRecall::UNDEFINED`]; with positives but no
/// detections it is `0.0` for both.
///
/// # Example
///
/// ```
/// use coco_stream_eval::metrics::ap::calculate_ap_recall;
///
/// let result = calculate_ap_recall(&[0.9], &[true], 1);
/// assert!((result.precision - 1.0).abs() < 1e-10);
/// assert_eq!(result.recall, 1.0);
///
/// assert_eq!(calculate_ap_recall(&[0.9], &[false], 0).precision, -1.0);
/// ```
pub fn calculate_ap_recall(scores: &[f64], matched: &[bool], num_positives: usize) -> ApRecall {
    if num_positives == 0 {
        return ApRecall::UNDEFINED;
    }
    if matched.is_empty() {
        return ApRecall {
            precision: 0.0,
            recall: 0.0,
        };
    }

    let mut order: Vec<usize> = (0..matched.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    let ranked: Vec<bool> = order.iter().map(|&i| matched[i]).collect();

    let curve = PrecisionRecallCurve::from_ranked_matches(&ranked, num_positives);
    ApRecall {
        precision: calculate_ap(&curve),
        recall: curve.final_recall(),
    }
}

/// Average of the interpolated precision values of a curve.
pub fn calculate_ap(curve: &PrecisionRecallCurve) -> f64 {
    let interpolated = curve.interpolated();
    interpolated.iter().sum::<f64>() / interpolated.len() as f64
}

/// Mean of the defined entries, skipping [`UNDEFINED`] values.
///
/// Returns [`UNDEFINED`] when no entry is defined.
///
/// # Example
///
/// ```
/// use coco_stream_eval::metrics::ap::calculate_map;
///
/// assert!((calculate_map(&[0.8, -1.0, 0.6]) - 0.7).abs() < 1e-10);
/// assert_eq!(calculate_map(&[-1.0, -1.0]), -1.0);
/// ```
pub fn calculate_map(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|&&v| v > UNDEFINED)
        .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));

    if count == 0 {
        return UNDEFINED;
    }
    sum / count as f64
}
