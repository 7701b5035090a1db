//! Accumulation of window-local detections into raster-global coordinates.
//!
//! Each window's detections are translated by the window origin and appended
//! to the raster's [`DetectionSet`]. Sub-threshold detections are dropped
//! here: detectors emit descending-score lists by convention, so scanning
//! stops at the first sub-threshold score. That ordering is validated, not
//! assumed; an out-of-order batch is sorted defensively before the cut.

use log::debug;

use crate::types::{Detection, DetectionSet};

/// Exclusively-owned per-raster accumulator, threaded through the scan.
pub struct Accumulator {
    set: DetectionSet,
    score_threshold: f32,
}

impl Accumulator {
    pub fn new(score_threshold: f32) -> Self {
        Self {
            set: DetectionSet::new(),
            score_threshold,
        }
    }

    /// Translate `local` by the window origin `(ox, oy)` and append every
    /// detection at or above the score threshold. Returns how many were
    /// appended. Existing entries are never mutated or reordered.
    pub fn absorb(&mut self, origin: (usize, usize), mut local: Vec<Detection>) -> usize {
        let sorted = local
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score);
        if !sorted {
            debug!(
                "detector output not sorted by descending score ({} detections), sorting",
                local.len()
            );
            local.sort_by(|a, b| b.score.total_cmp(&a.score));
        }

        let (ox, oy) = (origin.0 as f64, origin.1 as f64);
        let mut appended = 0;
        for detection in local {
            if detection.score < self.score_threshold {
                break;
            }
            self.set.push(Detection {
                bbox: detection.bbox.translated(ox, oy),
                ..detection
            });
            appended += 1;
        }
        appended
    }

    pub fn detections(&self) -> &DetectionSet {
        &self.set
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Hand the accumulated set over to the deduplication phase.
    pub fn into_set(self) -> DetectionSet {
        self.set
    }
}
