//! Evaluation grid: IoU thresholds, max-detections limits, and area ranges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Default lower area boundary (32²): boxes below it are "small".
pub const DEFAULT_SMALL_AREA: f64 = 1024.0;

/// Default upper area boundary (96²): boxes above it are "large".
pub const DEFAULT_LARGE_AREA: f64 = 9216.0;

/// Named area partition used to ignore ground truths and detections by box size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaRange {
    /// `area < lower`
    Small,
    /// `lower <= area <= upper`
    Medium,
    /// `area > upper`
    Large,
    /// Never ignores anything.
    All,
}

impl AreaRange {
    /// The four standard ranges in reporting order.
    pub const STANDARD: [AreaRange; 4] = [
        AreaRange::Small,
        AreaRange::Medium,
        AreaRange::Large,
        AreaRange::All,
    ];

    /// Range name as used in reports and filters.
    pub fn name(&self) -> &'static str {
        match self {
            AreaRange::Small => "small",
            AreaRange::Medium => "medium",
            AreaRange::Large => "large",
            AreaRange::All => "all",
        }
    }

    /// Whether a box of `area` falls outside this range and should be ignored.
    ///
    /// `bounds` is the `(lower, upper)` pair of the grid.
    ///
    /// # Example
    ///
    /// ```
    /// use coco_stream_eval::threshold::AreaRange;
    ///
    /// let bounds = (1024.0, 9216.0);
    /// assert!(!AreaRange::Small.is_ignored(100.0, bounds));
    /// assert!(AreaRange::Small.is_ignored(1024.0, bounds));
    /// assert!(!AreaRange::Medium.is_ignored(9216.0, bounds));
    /// assert!(!AreaRange::All.is_ignored(1e12, bounds));
    /// ```
    pub fn is_ignored(&self, area: f64, bounds: (f64, f64)) -> bool {
        let (lower, upper) = bounds;
        match self {
            AreaRange::Small => !(area < lower),
            AreaRange::Medium => !(lower <= area && area <= upper),
            AreaRange::Large => !(area > upper),
            AreaRange::All => false,
        }
    }
}

impl fmt::Display for AreaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AreaRange {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(AreaRange::Small),
            "medium" => Ok(AreaRange::Medium),
            "large" => Ok(AreaRange::Large),
            "all" => Ok(AreaRange::All),
            other => Err(EvalError::Configuration(format!(
                "unknown area range '{}', expected one of small, medium, large, all",
                other
            ))),
        }
    }
}

/// Position of one `(area_range, max_detections, iou_threshold)` key inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    pub area: usize,
    pub max_dets: usize,
    pub iou: usize,
}

/// The evaluation grid, fixed for the lifetime of a metric instance.
///
/// Defaults match the COCO protocol: 10 IoU thresholds (0.50:0.05:0.95),
/// max detections `[1, 10, 100]`, and the small/medium/large/all area ranges
/// split at 32² and 96².
///
/// Deserialized grids are validated like [`ThresholdGrid::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdGrid")]
pub struct ThresholdGrid {
    iou_thresholds: Vec<f64>,
    max_detections: Vec<usize>,
    area_bounds: (f64, f64),
    area_ranges: Vec<AreaRange>,
}

/// Wire form of [`ThresholdGrid`] before validation.
#[derive(Deserialize)]
struct RawThresholdGrid {
    iou_thresholds: Vec<f64>,
    max_detections: Vec<usize>,
    area_bounds: (f64, f64),
    area_ranges: Vec<AreaRange>,
}

impl TryFrom<RawThresholdGrid> for ThresholdGrid {
    type Error = EvalError;

    fn try_from(raw: RawThresholdGrid) -> Result<Self> {
        ThresholdGrid::new(
            raw.iou_thresholds,
            raw.max_detections,
            raw.area_bounds,
            raw.area_ranges,
        )
    }
}

impl ThresholdGrid {
    /// Create a validated grid.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the IoU list is empty or has values outside
    /// `[0, 1]`, if any max-detections value is zero or the list is empty, if the
    /// area bounds are not `0 <= lower < upper`, or if the area range list is
    /// empty or repeats a range.
    pub fn new(
        iou_thresholds: Vec<f64>,
        max_detections: Vec<usize>,
        area_bounds: (f64, f64),
        area_ranges: Vec<AreaRange>,
    ) -> Result<Self> {
        let grid = Self {
            iou_thresholds,
            max_detections,
            area_bounds,
            area_ranges,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Parse and validate a grid from JSON.
    ///
    /// # Example
    ///
    /// ```
    /// use coco_stream_eval::threshold::ThresholdGrid;
    ///
    /// let grid = ThresholdGrid::from_json(r#"{
    ///     "iou_thresholds": [0.5, 0.75],
    ///     "max_detections": [100],
    ///     "area_bounds": [1024.0, 9216.0],
    ///     "area_ranges": ["all"]
    /// }"#).unwrap();
    /// assert_eq!(grid.num_keys(), 2);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed input and `Configuration` for a grid that
    /// [`ThresholdGrid::new`] would reject.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawThresholdGrid = serde_json::from_str(json)?;
        ThresholdGrid::try_from(raw)
    }

    /// Serialize the grid to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Keep only the largest max-detections value and the `all` area range.
    ///
    /// This is the shape used when only a single precision or recall figure is
    /// reported.
    pub fn collapsed(&self) -> Self {
        let max_dets = self.max_detections.last().copied().unwrap_or(100);
        Self {
            iou_thresholds: self.iou_thresholds.clone(),
            max_detections: vec![max_dets],
            area_bounds: self.area_bounds,
            area_ranges: vec![AreaRange::All],
        }
    }

    pub fn iou_thresholds(&self) -> &[f64] {
        &self.iou_thresholds
    }

    pub fn max_detections(&self) -> &[usize] {
        &self.max_detections
    }

    pub fn area_bounds(&self) -> (f64, f64) {
        self.area_bounds
    }

    pub fn area_ranges(&self) -> &[AreaRange] {
        &self.area_ranges
    }

    /// Number of `(area, max_dets, iou)` keys in the grid.
    pub fn num_keys(&self) -> usize {
        self.area_ranges.len() * self.max_detections.len() * self.iou_thresholds.len()
    }

    /// Flat index of a key, area-major then max-detections then IoU.
    pub fn key_index(&self, key: GridKey) -> usize {
        (key.area * self.max_detections.len() + key.max_dets) * self.iou_thresholds.len() + key.iou
    }

    /// All keys in flat-index order.
    pub fn keys(&self) -> impl Iterator<Item = GridKey> + '_ {
        (0..self.area_ranges.len()).flat_map(move |area| {
            (0..self.max_detections.len()).flat_map(move |max_dets| {
                (0..self.iou_thresholds.len()).map(move |iou| GridKey {
                    area,
                    max_dets,
                    iou,
                })
            })
        })
    }

    fn validate(&self) -> Result<()> {
        if self.iou_thresholds.is_empty() {
            return Err(EvalError::Configuration(
                "at least one IoU threshold is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .iou_thresholds
            .iter()
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            return Err(EvalError::Configuration(format!(
                "IoU thresholds must be between 0.0 and 1.0, got {}",
                bad
            )));
        }
        if self.max_detections.is_empty() {
            return Err(EvalError::Configuration(
                "at least one max-detections value is required".to_string(),
            ));
        }
        if self.max_detections.contains(&0) {
            return Err(EvalError::Configuration(
                "max-detections values must be positive".to_string(),
            ));
        }
        let (lower, upper) = self.area_bounds;
        if !(lower.is_finite() && upper.is_finite() && lower >= 0.0 && lower < upper) {
            return Err(EvalError::Configuration(format!(
                "area bounds must satisfy 0 <= lower < upper, got ({}, {})",
                lower, upper
            )));
        }
        if self.area_ranges.is_empty() {
            return Err(EvalError::Configuration(
                "at least one area range is required".to_string(),
            ));
        }
        for (i, range) in self.area_ranges.iter().enumerate() {
            if self.area_ranges[..i].contains(range) {
                return Err(EvalError::Configuration(format!(
                    "area range '{}' listed more than once",
                    range
                )));
            }
        }
        Ok(())
    }
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        Self {
            iou_thresholds: generate_threshold_range(0.5, 0.95, 10)
                .unwrap_or_else(|_| vec![0.5]),
            max_detections: vec![1, 10, 100],
            area_bounds: (DEFAULT_SMALL_AREA, DEFAULT_LARGE_AREA),
            area_ranges: AreaRange::STANDARD.to_vec(),
        }
    }
}

/// Generate a range of threshold values for evaluation.
///
/// Values are `start + i * step` with the last value pinned to `end`, so the
/// default COCO IoU grid reproduces the usual `linspace(0.5, 0.95, 10)` values.
///
/// # Arguments
///
/// * `start` - Starting threshold value (inclusive)
/// * `end` - Ending threshold value (inclusive)
/// * `steps` - Number of threshold values to generate
///
/// # Returns
///
/// Returns a vector of evenly-spaced threshold values.
///
/// # Example
///
/// ```
/// use coco_stream_eval::threshold::generate_threshold_range;
///
/// let thresholds = generate_threshold_range(0.5, 0.95, 10).unwrap();
/// assert_eq!(thresholds.len(), 10);
/// assert_eq!(thresholds[0], 0.5);
/// assert_eq!(thresholds[9], 0.95);
/// ```
pub fn generate_threshold_range(start: f64, end: f64, steps: usize) -> Result<Vec<f64>> {
    if steps == 0 {
        return Err(EvalError::Configuration(
            "Number of steps must be greater than 0".to_string(),
        ));
    }

    validate_threshold(start)?;
    validate_threshold(end)?;

    if start > end {
        return Err(EvalError::Configuration(format!(
            "Start threshold ({}) must be <= end threshold ({})",
            start, end
        )));
    }

    if steps == 1 {
        return Ok(vec![start]);
    }

    let step_size = (end - start) / (steps - 1) as f64;
    let mut thresholds: Vec<f64> = (0..steps).map(|i| start + step_size * i as f64).collect();
    thresholds[steps - 1] = end;
    Ok(thresholds)
}

/// Validate that a threshold is in the valid range [0.0, 1.0].
fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EvalError::Configuration(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            threshold
        )));
    }
    Ok(())
}
