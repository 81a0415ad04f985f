//! Per-image class grouping and greedy detection matching.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::Array2;

use crate::metrics::iou::calculate_iou_matrix;
use crate::threshold::{GridKey, ThresholdGrid};
use crate::types::{BoundingBox, Detection, GroundTruth};

/// Detections and ground truths of one class within one image.
#[derive(Debug, Clone)]
pub struct ClassGroup<'a> {
    pub detections: Vec<&'a Detection>,
    pub ground_truths: Vec<&'a GroundTruth>,
    /// `[detections, ground_truths]` IoU matrix in the order of the two lists above.
    pub ious: Array2<f64>,
}

/// What one image contributes for one class under one grid key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyContribution {
    /// Confidences of the retained, non-ignored detections in confidence order.
    pub scores: Vec<f64>,
    /// Whether the detection at the same index was matched.
    pub matched: Vec<bool>,
    /// Non-ignored ground truths available in this image.
    pub positives: usize,
}

/// Contributions of one image/class pair for every key of a grid.
///
/// `keys` is indexed by [`ThresholdGrid::key_index`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageClassEvaluation {
    pub keys: Vec<KeyContribution>,
}

impl ImageClassEvaluation {
    /// Contribution for a given key.
    pub fn get(&self, grid: &ThresholdGrid, key: GridKey) -> Option<&KeyContribution> {
        self.keys.get(grid.key_index(key))
    }
}

/// Partition one image's detections and ground truths by class label.
///
/// Every label seen on either side gets an entry, so classes with only ground
/// truths (misses) or only detections (false positives) are still evaluated.
/// Classes are returned in ascending label order.
pub fn group_by_class<'a>(
    detections: &'a [Detection],
    ground_truths: &'a [GroundTruth],
) -> BTreeMap<u64, ClassGroup<'a>> {
    let mut sides: BTreeMap<u64, (Vec<&'a Detection>, Vec<&'a GroundTruth>)> = BTreeMap::new();

    for det in detections {
        sides.entry(det.class_id).or_default().0.push(det);
    }
    for gt in ground_truths {
        sides.entry(gt.class_id).or_default().1.push(gt);
    }

    sides
        .into_iter()
        .map(|(class_id, (detections, ground_truths))| {
            let det_boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
            let gt_boxes: Vec<BoundingBox> = ground_truths.iter().map(|g| g.bbox).collect();
            let ious = calculate_iou_matrix(&det_boxes, &gt_boxes);
            (
                class_id,
                ClassGroup {
                    detections,
                    ground_truths,
                    ious,
                },
            )
        })
        .collect()
}

/// Evaluate every class of one image against the grid.
pub fn evaluate_image(
    grid: &ThresholdGrid,
    detections: &[Detection],
    ground_truths: &[GroundTruth],
) -> BTreeMap<u64, ImageClassEvaluation> {
    group_by_class(detections, ground_truths)
        .iter()
        .map(|(&class_id, group)| (class_id, evaluate_image_class(grid, group)))
        .collect()
}

/// Match one class's detections to its ground truths for every grid key.
///
/// Detections are ranked by descending confidence (ties keep input order) and
/// truncated to each key's max-detections limit. Ground truths outside the
/// key's area range are moved behind the others, so a real ground truth wins
/// over an ignored one at equal IoU. Detections matched to an ignored ground
/// truth, or unmatched detections whose own area is out of range, are dropped
/// from the recorded scores.
pub fn evaluate_image_class(grid: &ThresholdGrid, group: &ClassGroup<'_>) -> ImageClassEvaluation {
    let mut keys = vec![KeyContribution::default(); grid.num_keys()];
    let bounds = grid.area_bounds();

    let mut det_order: Vec<usize> = (0..group.detections.len()).collect();
    det_order.sort_by(|&a, &b| {
        group.detections[b]
            .confidence
            .partial_cmp(&group.detections[a].confidence)
            .unwrap_or(Ordering::Equal)
    });

    for (area_idx, area) in grid.area_ranges().iter().enumerate() {
        let gt_ignore_orig: Vec<bool> = group
            .ground_truths
            .iter()
            .map(|gt| area.is_ignored(gt.bbox.area(), bounds))
            .collect();

        // stable: non-ignored first, original order within each half
        let mut gt_order: Vec<usize> = (0..group.ground_truths.len()).collect();
        gt_order.sort_by_key(|&g| gt_ignore_orig[g]);
        let gt_ignore: Vec<bool> = gt_order.iter().map(|&g| gt_ignore_orig[g]).collect();
        let positives = gt_ignore.iter().filter(|&&ignored| !ignored).count();

        let det_area_ignored: Vec<bool> = group
            .detections
            .iter()
            .map(|det| area.is_ignored(det.bbox.area(), bounds))
            .collect();

        for (max_dets_idx, &max_dets) in grid.max_detections().iter().enumerate() {
            let kept = &det_order[..max_dets.min(det_order.len())];

            for (iou_idx, &iou_threshold) in grid.iou_thresholds().iter().enumerate() {
                let matches =
                    match_detections(&group.ious, kept, &gt_order, &gt_ignore, iou_threshold);

                let contribution = &mut keys[grid.key_index(GridKey {
                    area: area_idx,
                    max_dets: max_dets_idx,
                    iou: iou_idx,
                })];
                contribution.positives = positives;

                for (&det_idx, matched_gt) in kept.iter().zip(&matches) {
                    let ignored = match matched_gt {
                        Some(g) => gt_ignore[*g],
                        None => det_area_ignored[det_idx],
                    };
                    if !ignored {
                        contribution.scores.push(group.detections[det_idx].confidence);
                        contribution.matched.push(matched_gt.is_some());
                    }
                }
            }
        }
    }

    ImageClassEvaluation { keys }
}

/// Greedy matching at a single IoU threshold.
///
/// `det_order` lists detection rows of `ious` in matching order; `gt_order`
/// lists ground-truth columns with non-ignored ones first, and `gt_ignore` is
/// aligned with `gt_order`. Returns, per entry of `det_order`, the position in
/// `gt_order` of the matched ground truth.
///
/// Each detection takes the unmatched ground truth with the highest IoU at or
/// above `min(iou_threshold, 1 - 1e-10)`, later candidates winning ties. Once a
/// detection holds a match, reaching the ignored tail ends its scan, so an
/// ignored ground truth only claims detections that found no real match first.
pub fn match_detections(
    ious: &Array2<f64>,
    det_order: &[usize],
    gt_order: &[usize],
    gt_ignore: &[bool],
    iou_threshold: f64,
) -> Vec<Option<usize>> {
    let mut gt_taken = vec![false; gt_order.len()];

    det_order
        .iter()
        .map(|&det_idx| {
            let mut best_iou = iou_threshold.min(1.0 - 1e-10);
            let mut best_match: Option<usize> = None;

            for (pos, &gt_idx) in gt_order.iter().enumerate() {
                if gt_taken[pos] {
                    continue;
                }
                if best_match.is_some() && gt_ignore[pos] {
                    break;
                }
                let iou = ious[[det_idx, gt_idx]];
                if iou >= best_iou {
                    best_iou = iou;
                    best_match = Some(pos);
                }
            }

            if let Some(pos) = best_match {
                gt_taken[pos] = true;
            }
            best_match
        })
        .collect()
}
