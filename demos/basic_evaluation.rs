//! Basic evaluation example: feed batches, then read AP/AR in every mode.
//!
//! Run with `RUST_LOG=debug` to see the per-batch log lines.

use coco_stream_eval::{
    metrics::iou::calculate_iou, AreaRange, AveragePrecision, BoundingBox, ComputeMode, Metric,
    MetricOutput, ResultFilter, SummaryKind, ThresholdGrid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Streaming COCO mAP Example ===\n");

    // Example 1: IoU Calculation
    println!("1. IoU Calculation");
    let bbox1 = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
    let bbox2 = BoundingBox::new(30.0, 30.0, 50.0, 50.0);
    println!("   IoU between overlapping boxes: {:.4}", calculate_iou(&bbox1, &bbox2));
    println!();

    // Example 2: Feed two batches of raw rows
    println!("2. Updating with raw rows");
    let mut metric = AveragePrecision::new(ComputeMode::Full);

    // detections: [x, y, w, h, confidence, label]; ground truths: [label, x, y, w, h]
    metric.update_rows(
        &[
            vec![
                [100.0, 100.0, 200.0, 150.0, 0.92, 1.0],
                [352.0, 198.0, 100.0, 120.0, 0.81, 2.0],
                [20.0, 20.0, 30.0, 30.0, 0.40, 2.0],
            ],
            vec![[10.0, 10.0, 25.0, 25.0, 0.66, 1.0]],
        ],
        &[
            vec![[1.0, 100.0, 100.0, 200.0, 150.0], [2.0, 350.0, 200.0, 100.0, 120.0]],
            vec![[1.0, 12.0, 11.0, 24.0, 26.0], [3.0, 300.0, 300.0, 80.0, 80.0]],
        ],
    )?;
    metric.update_rows(
        &[vec![[55.0, 60.0, 120.0, 90.0, 0.71, 3.0]]],
        &[vec![[3.0, 50.0, 60.0, 120.0, 90.0]]],
    )?;
    println!("   {}", metric.stats().summary_string());
    println!();

    // Example 3: Full results and the standard summary
    println!("3. COCO summary");
    let results = metric.compute_results()?;
    let summary = results.summary();
    println!("   mAP@[.50:.95]   {:.4}", summary.map);
    println!("   mAP@.50         {:.4}", summary.ap50);
    println!("   mAP@.75         {:.4}", summary.ap75);
    println!("   mAP small/medium/large  {:.4} / {:.4} / {:.4}", summary.ap_small, summary.ap_medium, summary.ap_large);
    println!("   mAR@1/10/100    {:.4} / {:.4} / {:.4}", summary.ar_1, summary.ar_10, summary.ar_100);
    println!();

    // Example 4: Slicing the result matrices
    println!("4. Per-class AP at IoU 0.5");
    let filter = ResultFilter::new().iou(0.5).area(AreaRange::All).max_dets(100);
    let per_class = results.summarize(Metric::Precision, &filter, SummaryKind::PerClass { clamp_negative: true })?;
    println!("   classes: {:?}", results.class_ids());
    println!("   values:  {:?}", per_class);
    println!();

    // Example 5: Scalar modes on a custom grid
    println!("5. Scalar AP on a two-threshold grid");
    let grid = ThresholdGrid::new(vec![0.5, 0.75], vec![10], (1024.0, 9216.0), vec![AreaRange::All])?;
    let mut scalar = AveragePrecision::with_grid(grid, ComputeMode::Precision);
    scalar.update_rows(
        &[vec![[0.0, 0.0, 40.0, 40.0, 0.9, 7.0]]],
        &[vec![[7.0, 2.0, 2.0, 40.0, 40.0]]],
    )?;
    if let MetricOutput::Precision(scores) = scalar.compute()? {
        println!("   class {:?} -> AP {:?}, mean {:.4}", scores.class_ids, scores.values, scores.mean);
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
