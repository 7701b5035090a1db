#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod accumulate;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod geo;
pub mod output;
pub mod pipeline;
pub mod raster;
pub mod types;
pub mod window;

// CLI plumbing – public for the bundled tools, unstable otherwise.
pub mod config;

// --- High-level re-exports -------------------------------------------------

// Main entry points: pipeline + results.
pub use crate::pipeline::{BatchSummary, Pipeline, PipelineParams, RasterScan, ScanReport};
pub use crate::types::{Detection, DetectionSet, PixelBox};

// Capability traits consumed by the pipeline.
pub use crate::detect::Detector;
pub use crate::geo::{CrsTransform, Geodesy};
pub use crate::raster::RasterSource;

// Named knobs that pin deliberate semantics.
pub use crate::dedup::OverlapMetric;
pub use crate::output::EmptyPolicy;
pub use crate::window::BoundaryPolicy;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use sitescan::prelude::*;
/// use sitescan::raster::MemoryRaster;
///
/// # fn main() {
/// let raster = MemoryRaster::rgb(512, 512, vec![0u8; 512 * 512 * 3]);
/// let detector = |_: &Window| -> Result<Vec<Detection>, DetectorError> { Ok(Vec::new()) };
/// let pipeline = Pipeline::new(PipelineParams::default(), detector).unwrap();
/// let scan = pipeline.scan_raster(&raster, "demo").unwrap();
/// println!("kept={} latency_ms={:.3}", scan.detections.len(), scan.report.latency_ms);
/// # }
/// ```
pub mod prelude {
    pub use crate::detect::Detector;
    pub use crate::error::{DetectorError, ScanError};
    pub use crate::pipeline::{Pipeline, PipelineParams, RasterScan};
    pub use crate::raster::RasterSource;
    pub use crate::types::{Detection, PixelBox};
    pub use crate::window::Window;
}
