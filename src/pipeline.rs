//! Per-raster scan orchestration and the batch driver.
//!
//! One raster run is strictly phased: stream windows (skipping blank ones),
//! invoke the detector per window, accumulate global detections, and only
//! after every window has been seen deduplicate, project and build output
//! rows. The dedup barrier is hard: suppression decisions depend on the full
//! candidate set, so no streaming NMS is possible.
//!
//! Failure policy follows the fail-open rule: a raster that cannot be opened
//! is skipped with a log entry and the batch continues; a detector failure
//! on one window contributes zero detections and the raster continues. A
//! raster missing from the output set is always explained by a preceding
//! log line.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::accumulate::Accumulator;
use crate::dedup::{suppress, OverlapMetric};
use crate::detect::Detector;
use crate::error::ScanError;
use crate::geo::{GeoProjector, Geodesy};
use crate::output::{
    write_report_file, DetectionRecord, EmptyPolicy, IntermediateWriter,
};
use crate::raster::RasterSource;
use crate::types::{Detection, DetectionSet};
use crate::window::{BoundaryPolicy, WindowGrid, WindowSource};

/// Pipeline-wide configuration, validated before any raster is opened.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Square window edge length fed to the detector.
    pub window_size: usize,
    /// Step between consecutive window origins.
    pub stride: usize,
    pub boundary: BoundaryPolicy,
    /// Detections below this score are dropped at accumulation time.
    pub score_threshold: f32,
    /// Suppression ratio above which an overlapping candidate is removed.
    pub overlap_threshold: f64,
    pub metric: OverlapMetric,
    pub empty_policy: EmptyPolicy,
    /// Class names in fixed output-column order.
    pub classes: Vec<String>,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            window_size: 1024,
            stride: 512,
            boundary: BoundaryPolicy::default(),
            score_threshold: 0.2,
            overlap_threshold: 0.15,
            metric: OverlapMetric::default(),
            empty_policy: EmptyPolicy::default(),
            classes: vec![
                "foundation".to_string(),
                "unfinished".to_string(),
                "completed".to_string(),
            ],
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.window_size == 0 {
            return Err(ScanError::InvalidParams("window_size must be > 0".into()));
        }
        if self.stride == 0 {
            return Err(ScanError::InvalidParams("stride must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ScanError::InvalidParams(format!(
                "score_threshold must be in [0, 1], got {}",
                self.score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(ScanError::InvalidParams(format!(
                "overlap_threshold must be in [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if self.classes.is_empty() {
            return Err(ScanError::InvalidParams(
                "at least one class name is required".into(),
            ));
        }
        Ok(())
    }

    pub fn grid(&self) -> WindowGrid {
        WindowGrid::new(self.window_size, self.stride).with_boundary(self.boundary)
    }
}

/// Per-raster scan diagnostics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScanReport {
    pub windows_total: usize,
    pub windows_blank: usize,
    pub read_failures: usize,
    pub detector_failures: usize,
    pub raw_detections: usize,
    pub kept_detections: usize,
    pub latency_ms: f64,
}

/// Final result of one raster run: the deduplicated global detections and
/// their enriched output rows.
#[derive(Clone, Debug, Serialize)]
pub struct RasterScan {
    pub raster: String,
    pub detections: Vec<Detection>,
    pub records: Vec<DetectionRecord>,
    pub report: ScanReport,
}

/// Summary of a batch run over several rasters.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct BatchSummary {
    pub scanned: usize,
    pub failed: usize,
}

/// Windowed-inference-and-merge pipeline over a fixed detector backend.
pub struct Pipeline<D: Detector> {
    params: PipelineParams,
    detector: D,
    geodesy: Option<Box<dyn Geodesy>>,
}

impl<D: Detector> Pipeline<D> {
    /// Build a pipeline, rejecting misconfigured thresholds up front.
    pub fn new(params: PipelineParams, detector: D) -> Result<Self, ScanError> {
        params.validate()?;
        Ok(Self {
            params,
            detector,
            geodesy: None,
        })
    }

    /// Attach an external geodesy capability; rasters whose projection it
    /// recognizes get a CRS-to-CRS transform after the affine step.
    pub fn with_geodesy(mut self, geodesy: Box<dyn Geodesy>) -> Self {
        self.geodesy = Some(geodesy);
        self
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Projector for one raster, including the optional CRS step.
    pub fn projector_for<R: RasterSource + ?Sized>(&self, raster: &R) -> GeoProjector {
        let projector = GeoProjector::new(raster.geotransform());
        match self
            .geodesy
            .as_ref()
            .and_then(|g| g.transform_for(raster.projection_ref()))
        {
            Some(crs) => projector.with_crs(crs),
            None => projector,
        }
    }

    /// Scan one raster end to end.
    pub fn scan_raster<R: RasterSource + ?Sized>(
        &self,
        raster: &R,
        name: &str,
    ) -> Result<RasterScan, ScanError> {
        self.scan_impl(raster, name, None)
    }

    /// Scan one raster, appending every accumulated detection to the
    /// intermediate log at `intermediate` as it is produced.
    pub fn scan_raster_resumable<R: RasterSource + ?Sized>(
        &self,
        raster: &R,
        name: &str,
        intermediate: &Path,
    ) -> Result<RasterScan, ScanError> {
        self.scan_impl(raster, name, Some(intermediate))
    }

    fn scan_impl<R: RasterSource + ?Sized>(
        &self,
        raster: &R,
        name: &str,
        intermediate: Option<&Path>,
    ) -> Result<RasterScan, ScanError> {
        let start = Instant::now();
        let grid = self.params.grid();
        let total = grid.count(raster.width(), raster.height());
        info!(
            "scan start raster={name} {}x{} windows={total}",
            raster.width(),
            raster.height()
        );

        let mut intermediate_log = match intermediate {
            Some(path) => Some(IntermediateWriter::append(path)?),
            None => None,
        };

        let mut report = ScanReport {
            windows_total: total,
            ..Default::default()
        };
        let mut accumulator = Accumulator::new(self.params.score_threshold);

        for (index, window) in WindowSource::new(raster, grid).enumerate() {
            let window = match window {
                Ok(w) => w,
                Err(err) => {
                    warn!("raster={name} window {index}/{total} read failed: {err}");
                    report.read_failures += 1;
                    continue;
                }
            };
            if window.is_uniform() {
                report.windows_blank += 1;
                continue;
            }

            let origin = (window.origin_col, window.origin_row);
            let local = match self.detector.detect(&window) {
                Ok(detections) => detections,
                Err(err) => {
                    // Fail open: one bad window must not discard the raster.
                    warn!("raster={name} window {index}/{total} at {origin:?}: {err}");
                    report.detector_failures += 1;
                    continue;
                }
            };

            let before = accumulator.len();
            let appended = accumulator.absorb(origin, local);
            debug!(
                "raster={name} window {index}/{total} origin={origin:?} appended={appended}"
            );
            if let Some(log) = intermediate_log.as_mut() {
                for detection in &accumulator.detections().as_slice()[before..] {
                    match self.params.classes.get(detection.label) {
                        Some(class) => log.record(name, detection, class)?,
                        None => warn!(
                            "raster={name} label {} has no class name, not logged",
                            detection.label
                        ),
                    }
                }
            }
        }

        let projector = self.projector_for(raster);
        let mut scan = self.finalize_accumulated(name, accumulator.into_set(), &projector);
        scan.report.windows_total = report.windows_total;
        scan.report.windows_blank = report.windows_blank;
        scan.report.read_failures = report.read_failures;
        scan.report.detector_failures = report.detector_failures;
        scan.report.latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "scan done raster={name} raw={} kept={} blank={} failed={} latency_ms={:.1}",
            scan.report.raw_detections,
            scan.report.kept_detections,
            scan.report.windows_blank,
            scan.report.read_failures + scan.report.detector_failures,
            scan.report.latency_ms
        );
        Ok(scan)
    }

    /// Deduplicate and project an already-accumulated detection set.
    ///
    /// This is the post-barrier half of the pipeline; the resume path feeds
    /// it detections parsed from an intermediate log.
    pub fn finalize_accumulated(
        &self,
        name: &str,
        set: DetectionSet,
        projector: &GeoProjector,
    ) -> RasterScan {
        let raw = set.len();
        let kept = suppress(
            set.as_slice(),
            self.params.overlap_threshold,
            self.params.metric,
        );

        let classes = &self.params.classes;
        let records = kept
            .iter()
            .enumerate()
            .map(|(index, detection)| {
                let mut scores = vec![0.0f32; classes.len()];
                match scores.get_mut(detection.label) {
                    Some(slot) => *slot = detection.score,
                    None => warn!(
                        "raster={name} label {} exceeds class table, scores left zero",
                        detection.label
                    ),
                }
                DetectionRecord {
                    id: index + 1,
                    scores,
                    geo_wkt: projector.geo_polygon(&detection.bbox).to_wkt(),
                    pixel_wkt: projector.pixel_polygon(&detection.bbox).to_wkt(),
                }
            })
            .collect();

        RasterScan {
            raster: name.to_string(),
            report: ScanReport {
                raw_detections: raw,
                kept_detections: kept.len(),
                ..Default::default()
            },
            detections: kept,
            records,
        }
    }

    /// Scan a batch of rasters in parallel and write one report per raster
    /// into `out_dir`.
    ///
    /// Rasters are independent: each gets its own detection set, and a
    /// failure to open or scan one is logged and skipped, never fatal for
    /// the batch.
    pub fn run_batch<R, F>(
        &self,
        inputs: &[PathBuf],
        open: F,
        out_dir: &Path,
    ) -> BatchSummary
    where
        R: RasterSource,
        F: Fn(&Path) -> Result<R, ScanError> + Sync,
    {
        let results: Vec<bool> = inputs
            .par_iter()
            .map(|path| {
                let name = path.display().to_string();
                let raster = match open(path) {
                    Ok(raster) => raster,
                    Err(err) => {
                        warn!("skipping raster {name}: {err}");
                        return false;
                    }
                };
                let scan = match self.scan_raster(&raster, &name) {
                    Ok(scan) => scan,
                    Err(err) => {
                        warn!("skipping raster {name}: {err}");
                        return false;
                    }
                };
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "raster".to_string());
                let out = out_dir.join(format!("{stem}.csv"));
                if let Err(err) = write_report_file(
                    &out,
                    &self.params.classes,
                    &scan.records,
                    self.params.empty_policy,
                ) {
                    warn!("failed to write report for {name}: {err}");
                    return false;
                }
                true
            })
            .collect();

        let scanned = results.iter().filter(|ok| **ok).count();
        BatchSummary {
            scanned,
            failed: results.len() - scanned,
        }
    }
}
