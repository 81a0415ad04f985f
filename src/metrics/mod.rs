//! Metrics calculation modules for detection evaluation.

pub mod iou;
pub mod ap;
pub mod precision_recall;

pub use iou::{calculate_iou, calculate_iou_matrix};
pub use ap::{calculate_ap, calculate_ap_recall, calculate_map, ApRecall, UNDEFINED};
pub use precision_recall::{
    interpolate_precision, precision_envelope, recall_levels, PrecisionRecallCurve,
};
