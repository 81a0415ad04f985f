//! Core data types for detections, ground truths, and per-image records.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Number of fields in a raw detection row: `[x, y, w, h, confidence, label]`.
pub const DETECTION_FIELDS: usize = 6;

/// Number of fields in a raw ground-truth row: `[label, x, y, w, h]`.
pub const GROUND_TRUTH_FIELDS: usize = 5;

/// Represents a bounding box in COCO format (x, y, width, height).
///
/// Coordinates are in LTWH (Left-Top-Width-Height) format where:
/// - x: Left coordinate
/// - y: Top coordinate
/// - width: Box width
/// - height: Box height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Get the right coordinate (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom coordinate (y + height).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if the bounding box is valid (finite coordinates, non-negative dimensions).
    ///
    /// Degenerate boxes with zero width or height are accepted; they simply never
    /// overlap anything.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    fn validated(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(EvalError::InvalidBoundingBox(format!(
                "expected finite coordinates and non-negative size, got {:?}",
                self
            )))
        }
    }
}

/// A single predicted box with its confidence and class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub class_id: u64,
}

impl Detection {
    /// Create a new detection.
    pub fn new(bbox: BoundingBox, confidence: f64, class_id: u64) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }

    /// Parse a raw `[x, y, w, h, confidence, label]` row.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the row does not have exactly six fields,
    /// `InvalidBoundingBox` for negative or non-finite dimensions, and
    /// `InvalidLabel` if the label is not a non-negative integer.
    ///
    /// # Example
    ///
    /// ```
    /// use coco_stream_eval::types::Detection;
    ///
    /// let det = Detection::from_row(&[0.0, 0.0, 10.0, 10.0, 0.9, 1.0]).unwrap();
    /// assert_eq!(det.class_id, 1);
    /// assert!(Detection::from_row(&[0.0, 0.0, 10.0, 10.0, 0.9]).is_err());
    /// ```
    pub fn from_row(row: &[f64]) -> Result<Self> {
        if row.len() != DETECTION_FIELDS {
            return Err(EvalError::ShapeMismatch(format!(
                "detection row must have {} fields [x, y, w, h, confidence, label], got {}",
                DETECTION_FIELDS,
                row.len()
            )));
        }
        if !row[4].is_finite() {
            return Err(EvalError::ShapeMismatch(format!(
                "detection confidence must be finite, got {}",
                row[4]
            )));
        }
        let bbox = BoundingBox::new(row[0], row[1], row[2], row[3]).validated()?;
        Ok(Self::new(bbox, row[4], parse_label(row[5])?))
    }
}

/// A single annotated box with its class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub class_id: u64,
    pub bbox: BoundingBox,
}

impl GroundTruth {
    /// Create a new ground truth.
    pub fn new(class_id: u64, bbox: BoundingBox) -> Self {
        Self { class_id, bbox }
    }

    /// Parse a raw `[label, x, y, w, h]` row.
    ///
    /// # Errors
    ///
    /// Same rules as [`Detection::from_row`], with five expected fields.
    pub fn from_row(row: &[f64]) -> Result<Self> {
        if row.len() != GROUND_TRUTH_FIELDS {
            return Err(EvalError::ShapeMismatch(format!(
                "ground truth row must have {} fields [label, x, y, w, h], got {}",
                GROUND_TRUTH_FIELDS,
                row.len()
            )));
        }
        let bbox = BoundingBox::new(row[1], row[2], row[3], row[4]).validated()?;
        Ok(Self::new(parse_label(row[0])?, bbox))
    }
}

/// Detections and ground truths for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub detections: Vec<Detection>,
    pub ground_truths: Vec<GroundTruth>,
}

impl ImageRecord {
    /// Create a new image record.
    pub fn new(detections: Vec<Detection>, ground_truths: Vec<GroundTruth>) -> Self {
        Self {
            detections,
            ground_truths,
        }
    }

    /// Build a record from raw detection and ground-truth rows.
    pub fn from_rows<D, G>(detections: &[D], ground_truths: &[G]) -> Result<Self>
    where
        D: AsRef<[f64]>,
        G: AsRef<[f64]>,
    {
        let detections = detections
            .iter()
            .map(|row| Detection::from_row(row.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let ground_truths = ground_truths
            .iter()
            .map(|row| GroundTruth::from_row(row.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(detections, ground_truths))
    }

    /// Validate the boxes and confidences of an already-typed record.
    pub fn validate(&self) -> Result<()> {
        validate_image(&self.detections, &self.ground_truths)
    }
}

/// Check that every box is valid and every confidence is finite.
pub fn validate_image(detections: &[Detection], ground_truths: &[GroundTruth]) -> Result<()> {
    for det in detections {
        det.bbox.validated()?;
        if !det.confidence.is_finite() {
            return Err(EvalError::ShapeMismatch(format!(
                "detection confidence must be finite, got {}",
                det.confidence
            )));
        }
    }
    for gt in ground_truths {
        gt.bbox.validated()?;
    }
    Ok(())
}

fn parse_label(value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value >= u64::MAX as f64 {
        return Err(EvalError::InvalidLabel(format!(
            "class label must be a non-negative integer, got {}",
            value
        )));
    }
    Ok(value as u64)
}
