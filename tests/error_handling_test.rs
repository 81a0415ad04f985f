//! Error handling tests: every failure mode surfaces as a typed `EvalError`
//! and leaves the metric state untouched.

use coco_stream_eval::accumulator::ClassAccumulator;
use coco_stream_eval::error::EvalError;
use coco_stream_eval::evaluator::{AveragePrecision, ComputeMode};
use coco_stream_eval::results::{Metric, ResultFilter};
use coco_stream_eval::threshold::{generate_threshold_range, AreaRange, ThresholdGrid};
use coco_stream_eval::types::{BoundingBox, Detection, GroundTruth, ImageRecord};

fn grid(iou: Vec<f64>, max_dets: Vec<usize>, bounds: (f64, f64), areas: Vec<AreaRange>) -> Result<ThresholdGrid, EvalError> {
    ThresholdGrid::new(iou, max_dets, bounds, areas)
}

fn valid_image() -> ImageRecord {
    ImageRecord::new(
        vec![Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 1)],
        vec![GroundTruth::new(1, BoundingBox::new(0.0, 0.0, 10.0, 10.0))],
    )
}

#[test]
fn test_grid_configuration_errors() {
    let areas = vec![AreaRange::All];
    let cases = vec![
        grid(vec![], vec![100], (1024.0, 9216.0), areas.clone()),
        grid(vec![1.5], vec![100], (1024.0, 9216.0), areas.clone()),
        grid(vec![-0.1], vec![100], (1024.0, 9216.0), areas.clone()),
        grid(vec![0.5], vec![], (1024.0, 9216.0), areas.clone()),
        grid(vec![0.5], vec![0, 10], (1024.0, 9216.0), areas.clone()),
        grid(vec![0.5], vec![100], (9216.0, 1024.0), areas.clone()),
        grid(vec![0.5], vec![100], (-1.0, 1024.0), areas.clone()),
        grid(vec![0.5], vec![100], (1024.0, f64::INFINITY), areas.clone()),
        grid(vec![0.5], vec![100], (1024.0, 9216.0), vec![]),
        grid(vec![0.5], vec![100], (1024.0, 9216.0), vec![AreaRange::All, AreaRange::All]),
    ];

    for (i, case) in cases.into_iter().enumerate() {
        assert!(
            matches!(case, Err(EvalError::Configuration(_))),
            "case {} should be a configuration error, got {:?}",
            i,
            case
        );
    }
}

#[test]
fn test_grid_json_errors() {
    assert!(matches!(ThresholdGrid::from_json("{not json"), Err(EvalError::Json(_))));
    let invalid = r#"{
        "iou_thresholds": [2.0],
        "max_detections": [100],
        "area_bounds": [1024.0, 9216.0],
        "area_ranges": ["all"]
    }"#;
    assert!(matches!(ThresholdGrid::from_json(invalid), Err(EvalError::Configuration(_))));
    let unknown_area = invalid.replace("2.0", "0.5").replace("\"all\"", "\"tiny\"");
    assert!(matches!(ThresholdGrid::from_json(&unknown_area), Err(EvalError::Json(_))));
}

#[test]
fn test_area_range_parse_error() {
    assert_eq!("Medium".parse::<AreaRange>().unwrap(), AreaRange::Medium);
    assert!(matches!("huge".parse::<AreaRange>(), Err(EvalError::Configuration(_))));
}

#[test]
fn test_threshold_range_errors() {
    assert!(generate_threshold_range(0.5, 0.95, 0).is_err());
    assert!(generate_threshold_range(0.9, 0.5, 5).is_err());
    assert!(generate_threshold_range(0.5, 1.2, 5).is_err());
}

#[test]
fn test_unsupported_modes() {
    assert!(matches!(ComputeMode::from_option(Some(2)), Err(EvalError::UnsupportedMode(_))));
    assert!(matches!("f1".parse::<ComputeMode>(), Err(EvalError::UnsupportedMode(_))));

    let metric = AveragePrecision::new(ComputeMode::Full);
    assert!(matches!(metric.compute_named("iou"), Err(EvalError::UnsupportedMode(_))));
    assert!(metric.compute_named("AP").is_ok());
}

#[test]
fn test_mismatched_batch_lengths() {
    let mut metric = AveragePrecision::new(ComputeMode::Full);
    let result = metric.update_pairs(&[vec![], vec![]], &[vec![]]);
    assert!(matches!(result, Err(EvalError::ShapeMismatch(_))));

    let rows: Vec<Vec<[f64; 6]>> = vec![vec![]];
    let gts: Vec<Vec<[f64; 5]>> = vec![];
    assert!(matches!(metric.update_rows(&rows, &gts), Err(EvalError::ShapeMismatch(_))));
}

#[test]
fn test_bad_rows() {
    let mut metric = AveragePrecision::new(ComputeMode::Full);

    let short = metric.update_rows(&[vec![vec![0.0, 0.0, 10.0, 10.0, 0.9]]], &[Vec::<Vec<f64>>::new()]);
    assert!(matches!(short, Err(EvalError::ShapeMismatch(_))));

    let fractional = metric.update_rows(&[Vec::<Vec<f64>>::new()], &[vec![vec![1.5, 0.0, 0.0, 10.0, 10.0]]]);
    assert!(matches!(fractional, Err(EvalError::InvalidLabel(_))));

    let negative = metric.update_rows(&[vec![[0.0, 0.0, -10.0, 10.0, 0.9, 1.0]]], &[Vec::<[f64; 5]>::new()]);
    assert!(matches!(negative, Err(EvalError::InvalidBoundingBox(_))));

    let nan_score = metric.update_rows(&[vec![[0.0, 0.0, 10.0, 10.0, f64::NAN, 1.0]]], &[Vec::<[f64; 5]>::new()]);
    assert!(matches!(nan_score, Err(EvalError::ShapeMismatch(_))));

    assert!(metric.accumulator().is_empty());
    assert_eq!(metric.stats().images, 0);
}

#[test]
fn test_failed_batch_leaves_state_untouched() {
    let mut metric = AveragePrecision::new(ComputeMode::Full);
    metric.update(&[valid_image()]).unwrap();
    let before = metric.accumulator().clone();

    let broken = ImageRecord::new(
        vec![Detection::new(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0), 0.5, 2)],
        vec![],
    );
    let result = metric.update(&[valid_image(), broken]);
    assert!(matches!(result, Err(EvalError::InvalidBoundingBox(_))));
    assert_eq!(metric.accumulator(), &before);
    assert_eq!(metric.stats().images, 1);
}

#[test]
fn test_merge_grid_mismatch() {
    let mut left = AveragePrecision::new(ComputeMode::Full);
    let right = AveragePrecision::new(ComputeMode::Precision);
    assert!(matches!(left.merge(right), Err(EvalError::Configuration(_))));
}

#[test]
fn test_accumulator_json_errors() {
    assert!(matches!(ClassAccumulator::from_json("[]"), Err(EvalError::Json(_))));

    let mut metric = AveragePrecision::new(ComputeMode::Precision);
    metric.update(&[valid_image()]).unwrap();
    let json = metric.accumulator().to_json().unwrap();

    // drop one score so `scores` and `matched` disagree
    let truncated = json.replacen("\"scores\":[0.9]", "\"scores\":[]", 1);
    assert_ne!(truncated, json);
    assert!(matches!(ClassAccumulator::from_json(&truncated), Err(EvalError::ShapeMismatch(_))));
}

#[test]
fn test_invalid_filter() {
    let mut metric = AveragePrecision::new(ComputeMode::Full);
    metric.update(&[valid_image()]).unwrap();
    let results = metric.compute_results().unwrap();

    let bad_iou = ResultFilter::new().iou(0.42);
    assert!(matches!(results.filter(Metric::Precision, &bad_iou), Err(EvalError::InvalidFilter(_))));
    let bad_dets = ResultFilter::new().max_dets(5);
    assert!(matches!(results.mean(Metric::Recall, &bad_dets), Err(EvalError::InvalidFilter(_))));

    let collapsed = AveragePrecision::new(ComputeMode::Recall).compute_results().unwrap();
    let bad_area = ResultFilter::new().area(AreaRange::Small);
    assert!(matches!(collapsed.per_class(Metric::Recall, &bad_area, true), Err(EvalError::InvalidFilter(_))));
}

#[test]
fn test_error_messages() {
    let err = ComputeMode::from_option(Some(7)).unwrap_err();
    assert!(err.to_string().contains('7'));

    let err = grid(vec![0.5], vec![100], (5.0, 1.0), vec![AreaRange::All]).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("area bounds"));
}

#[test]
fn test_deserialized_grid_is_validated() {
    let no_max_dets = r#"{
        "iou_thresholds": [0.5],
        "max_detections": [],
        "area_bounds": [1024.0, 9216.0],
        "area_ranges": ["all"]
    }"#;
    let parsed = serde_json::from_str::<ThresholdGrid>(no_max_dets);
    assert!(parsed.is_err(), "invalid grid must not deserialize, got {:?}", parsed);
    assert!(matches!(ThresholdGrid::from_json(no_max_dets), Err(EvalError::Configuration(_))));

    let no_areas = no_max_dets
        .replace("\"max_detections\": []", "\"max_detections\": [100]")
        .replace("[\"all\"]", "[]");
    assert!(serde_json::from_str::<ThresholdGrid>(&no_areas).is_err());

    let valid = no_areas.replace("[]", "[\"all\"]");
    let grid = serde_json::from_str::<ThresholdGrid>(&valid).unwrap();
    let mut metric = AveragePrecision::with_grid(grid, ComputeMode::Precision);
    metric.update(&[valid_image()]).unwrap();
    assert!(metric.compute().is_ok());
}

#[test]
fn test_accumulator_json_with_invalid_grid() {
    let metric = AveragePrecision::new(ComputeMode::Precision);
    let json = metric.accumulator().to_json().unwrap();
    let broken = json.replacen("\"max_detections\":[100]", "\"max_detections\":[]", 1);
    assert_ne!(broken, json);
    assert!(matches!(ClassAccumulator::from_json(&broken), Err(EvalError::Json(_))));
}
