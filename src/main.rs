use haar_detector::cascade::{Cascade, HaarFeature, Stage, WeakClassifier, WeightedRect};
use haar_detector::image::ImageU8;
use haar_detector::types::WindowSize;
use haar_detector::{DetectorParams, HaarDetector};

fn main() {
    // Demo: a one-stump dark/bright edge cascade over a synthetic frame.
    let (w, h) = (320usize, 240usize);
    let mut gray = vec![40u8; w * h];
    for y in 80..140 {
        for x in 160..200 {
            gray[y * w + x] = 210;
        }
    }
    let img = ImageU8 {
        w,
        h,
        stride: w,
        data: &gray,
    };

    let edge = HaarFeature::two(
        WeightedRect::new(0, 0, 24, 24, -1.0),
        WeightedRect::new(12, 0, 12, 24, 2.0),
    );
    let cascade = Cascade::new(
        WindowSize::new(24, 24),
        vec![Stage::new(
            vec![WeakClassifier::new(edge, 0.5, -1.0, 1.0)],
            0.0,
        )],
    );

    let det = HaarDetector::new(cascade, DetectorParams::default());
    match det.process_with_diagnostics(img) {
        Ok(report) => {
            for d in &report.detections {
                println!("{} {} {}x{} hits={}", d.x, d.y, d.width, d.height, d.hits);
            }
            println!(
                "raw={} merged={} total_ms={:.3}",
                report.trace.raw_count, report.trace.merged_count, report.trace.timings.total_ms
            );
        }
        Err(err) => eprintln!("Error: {err}"),
    }
}
