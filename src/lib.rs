//! # coco-stream-eval
//!
//! A Rust library for streaming COCO-style object detection metrics: mean Average
//! Precision (mAP) and mean Average Recall (mAR) accumulated over batches of images.
//!
//! The engine provides:
//! - **IoU** matrices between detection and ground-truth boxes, grouped per class
//! - **Greedy matching** under every IoU threshold, max-detections limit, and area range
//! - **Accumulation** across any number of `update` calls, with a merge operation for
//!   shards evaluated by independent workers
//! - **101-point interpolated AP** and **AR** per class, with `-1` marking classes
//!   that have no ground truth
//! - **Filtering and summaries** over the `[iou, area, max_dets, class]` result matrices
//!
//! ## Quick Start
//!
//! ```rust
//! use coco_stream_eval::evaluator::{AveragePrecision, ComputeMode, MetricOutput};
//! use coco_stream_eval::results::{Metric, ResultFilter};
//! use coco_stream_eval::threshold::AreaRange;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut metric = AveragePrecision::new(ComputeMode::Full);
//!
//! // detections: [x, y, w, h, confidence, label]; ground truths: [label, x, y, w, h]
//! let predictions = vec![vec![[0.0, 0.0, 10.0, 10.0, 0.9, 1.0]]];
//! let ground_truths = vec![vec![[1.0, 0.0, 0.0, 10.0, 10.0]]];
//! metric.update_rows(&predictions, &ground_truths)?;
//!
//! if let MetricOutput::Full(results) = metric.compute()? {
//!     let filter = ResultFilter::new().area(AreaRange::All).max_dets(100);
//!     let map = results.mean(Metric::Precision, &filter)?;
//!     assert!((map - 1.0).abs() < 1e-10);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Box Format
//!
//! Boxes are `[x, y, width, height]` with `(x, y)` the top-left corner. Detections
//! and ground truths must use the same units; no normalization is applied.

pub mod error;
pub mod types;
pub mod threshold;
pub mod metrics;
pub mod matching;
pub mod accumulator;
pub mod results;
pub mod stats;
pub mod evaluator;

// Re-export commonly used types and functions
pub use error::{EvalError, Result};
pub use types::{BoundingBox, Detection, GroundTruth, ImageRecord};
pub use threshold::{generate_threshold_range, AreaRange, ThresholdGrid};
pub use accumulator::{ClassAccumulator, KeyStatistics};
pub use results::{DetectionSummary, Metric, MetricResults, ResultFilter, Summary, SummaryKind};
pub use evaluator::{AveragePrecision, ClassScores, ComputeMode, MetricOutput};
