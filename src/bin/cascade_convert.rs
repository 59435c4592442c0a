use haar_detector::image::io::{write_json_file, write_text_file};
use haar_detector::Cascade;
use std::env;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let input = args.next().ok_or_else(usage)?;
    let output = args.next().ok_or_else(usage)?;
    let (input, output) = (Path::new(&input), Path::new(&output));

    let cascade = Cascade::load(input).map_err(|e| e.to_string())?;
    if is_json(output) {
        write_json_file(output, &cascade.to_table())?;
    } else {
        write_text_file(output, &cascade.to_text())?;
    }
    println!(
        "Converted {} -> {} ({} stages, {} classifiers{})",
        input.display(),
        output.display(),
        cascade.stage_count(),
        cascade.classifier_count(),
        if cascade.has_tilted_features() {
            ", tilted features disabled"
        } else {
            ""
        }
    );
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn usage() -> String {
    "Usage: cascade_convert <input.txt|input.json> <output.txt|output.json>".to_string()
}
