//! Distributed evaluation example: workers accumulate shards, ship them as
//! JSON, and a coordinator merges them before a single compute.

use coco_stream_eval::{
    AveragePrecision, BoundingBox, ClassAccumulator, ComputeMode, Detection, GroundTruth,
    ImageRecord, ThresholdGrid,
};

fn shard_images(worker: usize, count: usize) -> Vec<ImageRecord> {
    (0..count)
        .map(|i| {
            let class_id = ((worker + i) % 3) as u64;
            let base = BoundingBox::new(20.0 * i as f64, 15.0 * worker as f64, 64.0, 48.0);
            let shifted = BoundingBox::new(base.x + 4.0, base.y + 3.0, base.width, base.height);
            ImageRecord::new(
                vec![
                    Detection::new(shifted, 0.9 - 0.05 * i as f64, class_id),
                    Detection::new(BoundingBox::new(500.0, 500.0, 20.0, 20.0), 0.3, class_id),
                ],
                vec![GroundTruth::new(class_id, base)],
            )
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Distributed Merge Example ===\n");

    // Each worker evaluates its own images and serializes the accumulator.
    let mut payloads = Vec::new();
    for worker in 0..4 {
        let mut metric = AveragePrecision::new(ComputeMode::Full);
        metric.update(&shard_images(worker, 5))?;
        let payload = metric.accumulator().to_json()?;
        println!("worker {}: {} classes, {} bytes", worker, metric.accumulator().num_classes(), payload.len());
        payloads.push(payload);
    }

    // The coordinator restores and merges the shards in worker order.
    let mut merged = ClassAccumulator::new(ThresholdGrid::default());
    for payload in &payloads {
        merged.merge(ClassAccumulator::from_json(payload)?)?;
    }

    // Feeding the same images to one instance gives identical state.
    let mut reference = AveragePrecision::new(ComputeMode::Full);
    for worker in 0..4 {
        reference.update(&shard_images(worker, 5))?;
    }
    println!("\nmerged state equals single-process state: {}", &merged == reference.accumulator());

    let summary = reference.compute_results()?.summary();
    println!("mAP@[.50:.95] {:.4}  mAP@.50 {:.4}  mAR@100 {:.4}", summary.map, summary.ap50, summary.ar_100);

    println!("\n=== Example Complete ===");
    Ok(())
}
