use std::path::PathBuf;
use thiserror::Error;

/// Pipeline-level failures.
///
/// Raster-open and raster-read failures are fatal for their raster only; the
/// batch driver logs them and continues with the remaining rasters.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid pipeline parameters: {0}")]
    InvalidParams(String),

    #[error("failed to open raster {path}: {reason}")]
    RasterOpen { path: PathBuf, reason: String },

    #[error("raster read failed at window ({col}, {row}): {reason}")]
    RasterRead {
        col: usize,
        row: usize,
        reason: String,
    },

    #[error("failed to load config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("malformed detections csv {path} at line {line}: {reason}")]
    MalformedCsv {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a detector backend for a single window.
///
/// The pipeline treats this as "zero detections for this window": it is
/// logged, never propagated, so one bad window cannot discard a raster's
/// otherwise-valid detections.
#[derive(Debug, Error)]
#[error("detector failed: {0}")]
pub struct DetectorError(String);

impl DetectorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
