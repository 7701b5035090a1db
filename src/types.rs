use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, closed on both ends.
///
/// The closed convention means a box covering a single pixel has
/// `min == max` and an area of one, so `area` is
/// `(max_x - min_x + 1) * (max_y - min_y + 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Area under the closed-box convention.
    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x + 1.0) * (self.max_y - self.min_y + 1.0)
    }

    /// Box shifted by `(dx, dy)` on both corners.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// Overlap area with `other`, zero when the boxes are disjoint.
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let w = (self.max_x.min(other.max_x) - self.min_x.max(other.min_x) + 1.0).max(0.0);
        let h = (self.max_y.min(other.max_y) - self.min_y.max(other.min_y) + 1.0).max(0.0);
        w * h
    }

    /// True when the box has no positive extent on either axis.
    pub fn is_degenerate(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }
}

/// One detected object in pixel space.
///
/// Boxes are window-local as emitted by a [`crate::detect::Detector`] and
/// raster-global after accumulation; only global detections persist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: PixelBox,
    /// Class id as reported by the detector.
    pub label: usize,
    /// Confidence in [0, 1].
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: PixelBox, label: usize, score: f32) -> Self {
        Self { bbox, label, score }
    }
}

/// Ordered detections for a single raster.
///
/// Mutable only by append during the scan phase and by wholesale replacement
/// with the deduplicator's output; owned exclusively by one per-raster run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    /// Replace the whole set with the deduplicator's output.
    pub fn replace(&mut self, detections: Vec<Detection>) {
        self.detections = detections;
    }

    pub fn into_vec(self) -> Vec<Detection> {
        self.detections
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}
