//! Finalize a prior scan's intermediate detections log.
//!
//! Reads the accumulated global detections, groups them per raster, reopens
//! each raster for its geotransform, runs deduplication and projection, and
//! writes one final report CSV per raster.

use std::env;
use std::path::Path;

use log::warn;

use sitescan::config::{load_config, RuntimeConfig};
use sitescan::error::DetectorError;
use sitescan::geo::GeoTransform;
use sitescan::output::{read_intermediate, write_report_file};
use sitescan::raster::ImageRaster;
use sitescan::types::Detection;
use sitescan::window::Window;
use sitescan::Pipeline;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(|| {
        let program = env::args().next().unwrap_or_else(|| "scan".to_string());
        format!("usage: {program} <config.json>")
    })?;
    let config = load_config(Path::new(&config_path)).map_err(|e| e.to_string())?;

    let grouped = read_intermediate(&config.detections_csv, &config.params.classes)
        .map_err(|e| e.to_string())?;
    if grouped.is_empty() {
        println!("no detections in {}", config.detections_csv.display());
        return Ok(());
    }

    // Finalization never invokes a detector; the capability slot is inert.
    let inert = |_: &Window| -> Result<Vec<Detection>, DetectorError> { Ok(Vec::new()) };
    let pipeline = Pipeline::new(config.params.clone(), inert).map_err(|e| e.to_string())?;

    let mut written = 0usize;
    for (raster_path, detections) in grouped {
        let path = Path::new(&raster_path);
        let raster = match open_raster(path, &config) {
            Ok(raster) => raster,
            Err(reason) => {
                warn!("skipping raster {raster_path}: {reason}");
                continue;
            }
        };

        let projector = pipeline.projector_for(&raster);
        let scan = pipeline.finalize_accumulated(&raster_path, detections.into(), &projector);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "raster".to_string());
        let out = config.output_dir.join(format!("{stem}.csv"));
        write_report_file(
            &out,
            &pipeline.params().classes,
            &scan.records,
            pipeline.params().empty_policy,
        )
        .map_err(|e| e.to_string())?;

        println!(
            "{raster_path}: {} -> {} detections, report {}",
            scan.report.raw_detections,
            scan.report.kept_detections,
            out.display()
        );
        written += 1;
    }

    println!("wrote {written} report(s) to {}", config.output_dir.display());
    Ok(())
}

fn open_raster(path: &Path, config: &RuntimeConfig) -> Result<ImageRaster, String> {
    let raster = ImageRaster::open(path).map_err(|e| e.to_string())?;
    Ok(match config.geotransform {
        Some(coeffs) => raster.with_geotransform(GeoTransform::new(coeffs)),
        None => raster,
    })
}
