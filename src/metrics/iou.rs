//! Intersection over Union (IoU) calculation.

use ndarray::Array2;

use crate::types::BoundingBox;

/// Calculate the Intersection over Union (IoU) between two bounding boxes.
///
/// IoU is defined as the area of intersection divided by the area of union.
/// Boxes that do not overlap, and degenerate boxes with zero union, give 0.0.
///
/// # Arguments
///
/// * `bbox1` - First bounding box
/// * `bbox2` - Second bounding box
///
/// # Returns
///
/// Returns a value between 0.0 (no overlap) and 1.0 (perfect overlap).
///
/// # Example
///
/// ```
/// use coco_stream_eval::metrics::iou::calculate_iou;
/// use coco_stream_eval::types::BoundingBox;
///
/// let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let bbox2 = BoundingBox::new(5.0, 5.0, 10.0, 10.0);
/// let iou = calculate_iou(&bbox1, &bbox2);
/// assert!(iou > 0.0 && iou < 1.0);
/// ```
pub fn calculate_iou(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    let intersection = intersection_area(bbox1, bbox2);
    if intersection <= 0.0 {
        return 0.0;
    }

    let union = bbox1.area() + bbox2.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }

    intersection / union
}

/// Area shared by two boxes, zero when they are disjoint or only touch.
pub fn intersection_area(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    let overlap_w = bbox1.right().min(bbox2.right()) - bbox1.x.max(bbox2.x);
    let overlap_h = bbox1.bottom().min(bbox2.bottom()) - bbox1.y.max(bbox2.y);
    overlap_w.max(0.0) * overlap_h.max(0.0)
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// # Arguments
///
/// * `detections` - Detection boxes (rows)
/// * `ground_truths` - Ground-truth boxes (columns)
///
/// # Returns
///
/// Returns a `[num_detections, num_ground_truths]` array where `result[[i, j]]` is
/// the IoU between `detections[i]` and `ground_truths[j]`. Either side may be
/// empty, which yields a matrix with a zero-length axis.
///
/// # Example
///
/// ```
/// use coco_stream_eval::metrics::iou::calculate_iou_matrix;
/// use coco_stream_eval::types::BoundingBox;
///
/// let detections = vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)];
/// let ground_truths = vec![BoundingBox::new(5.0, 5.0, 10.0, 10.0)];
/// let iou_matrix = calculate_iou_matrix(&detections, &ground_truths);
/// assert_eq!(iou_matrix.dim(), (1, 1));
/// ```
pub fn calculate_iou_matrix(detections: &[BoundingBox], ground_truths: &[BoundingBox]) -> Array2<f64> {
    Array2::from_shape_fn((detections.len(), ground_truths.len()), |(i, j)| {
        calculate_iou(&detections[i], &ground_truths[j])
    })
}
