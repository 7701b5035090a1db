//! External detector capability.
//!
//! The pipeline consumes a detector only through [`Detector::detect`], so
//! any model runtime can be substituted without touching the windowing, NMS
//! or projection stages.

use crate::error::DetectorError;
use crate::types::Detection;
use crate::window::Window;

/// Black-box object detector over one fixed-size window buffer.
///
/// Input is a `size * size * bands` buffer in canonical RGB order. Output
/// boxes are window-local pixel coordinates, scores in [0, 1], integer
/// labels. By convention detections arrive sorted by descending score; the
/// accumulator validates that rather than assuming it.
pub trait Detector: Send + Sync {
    fn detect(&self, window: &Window) -> Result<Vec<Detection>, DetectorError>;
}

impl<F> Detector for F
where
    F: Fn(&Window) -> Result<Vec<Detection>, DetectorError> + Send + Sync,
{
    fn detect(&self, window: &Window) -> Result<Vec<Detection>, DetectorError> {
        self(window)
    }
}
