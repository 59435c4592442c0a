use haar_detector::bundle::{BundleFrame, DetectorBundle};
use haar_detector::config::detect::{self, DetectToolConfig, DetectorSource};
use haar_detector::diagnostics::DetectionReport;
use haar_detector::image::io::{write_json_file, GrayFrame};
use haar_detector::integral::IntegralImage;
use haar_detector::types::Detection;
use haar_detector::{Cascade, HaarDetector};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CascadeRunReport {
    input: PathBuf,
    cascade: PathBuf,
    report: DetectionReport,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleRunReport {
    input: PathBuf,
    bundle: PathBuf,
    bundle_id: String,
    elapsed_ms: f64,
    frame: BundleFrame,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = detect::load_config(Path::new(&config_path))?;
    let mut gray = GrayFrame::open(&config.input)?;

    let detections = match config.source()? {
        DetectorSource::Cascade(path) => run_cascade(&config, path, &gray)?,
        DetectorSource::Bundle(path) => run_bundle(&config, path, &gray)?,
    };

    if let Some(overlay) = &config.output.overlay {
        for det in &detections {
            gray.outline(det.rect(), 255);
        }
        gray.save(overlay)?;
        println!("Overlay written to {}", overlay.display());
    }
    Ok(())
}

fn run_cascade(
    config: &DetectToolConfig,
    path: &Path,
    gray: &GrayFrame,
) -> Result<Vec<Detection>, String> {
    let cascade = Cascade::load(path).map_err(|e| e.to_string())?;
    println!(
        "Cascade {}: window {}x{}, {} stages, {} classifiers",
        path.display(),
        cascade.orig_window_size().width,
        cascade.orig_window_size().height,
        cascade.stage_count(),
        cascade.classifier_count()
    );
    let detector = HaarDetector::new(cascade, config.detector_params());
    let report = detector
        .process_with_diagnostics(gray.view())
        .map_err(|e| format!("Detection failed: {e}"))?;

    let trace = &report.trace;
    println!(
        "Scanned {} scales over {:?}: {} raw hits, {} after merge ({:?})",
        trace.scales.len(),
        trace.roi,
        trace.raw_count,
        trace.merged_count,
        trace.status
    );
    for t in &trace.timings.stages {
        println!("  {:<9} {:8.3} ms", t.label, t.elapsed_ms);
    }
    println!("  {:<9} {:8.3} ms", "total", trace.timings.total_ms);
    print_detections(&report.detections);

    let detections = report.detections.clone();
    let out = CascadeRunReport {
        input: config.input.clone(),
        cascade: path.to_path_buf(),
        report,
    };
    write_json_file(&config.output.json, &out)?;
    println!("JSON report written to {}", config.output.json.display());
    Ok(detections)
}

fn run_bundle(
    config: &DetectToolConfig,
    path: &Path,
    gray: &GrayFrame,
) -> Result<Vec<Detection>, String> {
    let mut bundle = DetectorBundle::load(path).map_err(|e| e.to_string())?;
    println!("Bundle {:?}: {} tags", bundle.id, bundle.tags.len());
    let start = Instant::now();
    let integral = IntegralImage::build(gray.view()).map_err(|e| e.to_string())?;
    let frame = bundle
        .run(&integral, &config.bundle_params)
        .map_err(|e| format!("Detection failed: {e}"))?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut all = Vec::new();
    for tag in &frame.tags {
        println!(
            "Tag {} ({}, {}x{}): {} raw hits, {} after merge",
            tag.index,
            tag.kind,
            tag.window.width,
            tag.window.height,
            tag.raw_count,
            tag.detections.len()
        );
        print_detections(&tag.detections);
        all.extend_from_slice(&tag.detections);
    }
    println!(
        "Scan bar {:?}: in_bar={} event={:?}",
        frame.scan_bar, frame.state.in_bar, frame.event
    );
    println!("Bundle run took {:.3} ms", elapsed_ms);

    let out = BundleRunReport {
        input: config.input.clone(),
        bundle: path.to_path_buf(),
        bundle_id: bundle.id.clone(),
        elapsed_ms,
        frame,
    };
    write_json_file(&config.output.json, &out)?;
    println!("JSON report written to {}", config.output.json.display());
    Ok(all)
}

fn print_detections(detections: &[Detection]) {
    for d in detections {
        println!(
            "  [{:4}, {:4}] {:3}x{:<3} hits={}",
            d.x, d.y, d.width, d.height, d.hits
        );
    }
}

fn usage() -> String {
    "Usage: haar_detect <config.json>".to_string()
}
