use sitescan::prelude::*;
use sitescan::raster::MemoryRaster;

fn main() {
    // Demo stub: synthetic raster with one bright square, and a toy detector
    // that reports the bounding box of saturated pixels in each window.
    let size = 2000usize;
    let mut data = vec![40u8; size * size * 3];
    for y in 900..1100 {
        for x in 900..1100 {
            let i = (y * size + x) * 3;
            data[i] = 255;
            data[i + 1] = 255;
            data[i + 2] = 255;
        }
    }
    let raster = MemoryRaster::rgb(size, size, data);

    // Mirrors BrightRegionDetector in tests/common/synthetic_raster.rs
    // (kept inline here so the demo stays a self-contained read); change
    // the scoring in both places together.
    let detector = |w: &Window| -> Result<Vec<Detection>, DetectorError> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for y in 0..w.size {
            for x in 0..w.size {
                if w.data[(y * w.size + x) * w.bands] == 255 {
                    bounds = Some(match bounds {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        Ok(bounds
            .map(|(x0, y0, x1, y1)| {
                // A region touching the window border is presumed clipped.
                let edge = w.size - 1;
                let clipped = x0 == 0 || y0 == 0 || x1 == edge || y1 == edge;
                Detection::new(
                    PixelBox::new(x0 as f64, y0 as f64, x1 as f64, y1 as f64),
                    1,
                    if clipped { 0.6 } else { 0.95 },
                )
            })
            .into_iter()
            .collect())
    };

    let pipeline = Pipeline::new(PipelineParams::default(), detector).expect("valid params");
    let scan = pipeline.scan_raster(&raster, "synthetic").expect("scan");
    println!(
        "raw={} kept={} latency_ms={:.3}",
        scan.report.raw_detections, scan.report.kept_detections, scan.report.latency_ms
    );
    for (detection, record) in scan.detections.iter().zip(&scan.records) {
        println!(
            "#{} label={} score={:.2} box=({}, {}, {}, {})",
            record.id,
            detection.label,
            detection.score,
            detection.bbox.min_x,
            detection.bbox.min_y,
            detection.bbox.max_x,
            detection.bbox.max_y
        );
    }
}
