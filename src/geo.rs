//! Pixel-to-geographic projection and polygon construction.
//!
//! A raster's affine geotransform maps pixel `(col, row)` to projected
//! `(X, Y)`. The six coefficients follow the usual raster convention
//! `(x0, a, b, y0, c, d)`:
//!
//! ```text
//! X = a*px + b*py + x0
//! Y = c*px + d*py + y0
//! ```
//!
//! The projector additionally shifts by `(a/2, d/2)` so coordinates refer to
//! the center of the pixel, not its top-left corner. This offset is required
//! for correct georeferencing, not cosmetic.
//!
//! When the raster's native projection differs from the desired output CRS,
//! a [`CrsTransform`] obtained from an external [`Geodesy`] capability is
//! applied after the affine step.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::types::PixelBox;

/// Six-coefficient affine geotransform `(x0, a, b, y0, c, d)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    coeffs: [f64; 6],
}

impl GeoTransform {
    pub fn new(coeffs: [f64; 6]) -> Self {
        Self { coeffs }
    }

    /// Identity transform: projected coordinates equal pixel centers.
    pub fn identity() -> Self {
        Self::new([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn coefficients(&self) -> [f64; 6] {
        self.coeffs
    }

    /// Map a pixel coordinate to the projected coordinate of its center.
    pub fn pixel_to_projected(&self, px: f64, py: f64) -> (f64, f64) {
        let [x0, a, b, y0, c, d] = self.coeffs;
        let linear = Matrix2::new(a, b, c, d);
        let p = linear * Vector2::new(px, py);
        // Half-pixel shift moves the coordinate to the pixel center.
        (p.x + x0 + a / 2.0, p.y + y0 + d / 2.0)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Projection-to-CRS mapping obtained from an external geodesy capability.
pub trait CrsTransform: Send + Sync {
    /// Map `(x, y)` in the source projection into the target CRS.
    fn transform(&self, x: f64, y: f64) -> (f64, f64);
}

impl<F> CrsTransform for F
where
    F: Fn(f64, f64) -> (f64, f64) + Send + Sync,
{
    fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        self(x, y)
    }
}

/// External geodesy capability: builds a [`CrsTransform`] for a raster's
/// projection descriptor, or `None` when no reprojection is needed.
pub trait Geodesy: Send + Sync {
    fn transform_for(&self, projection_ref: &str) -> Option<Box<dyn CrsTransform>>;
}

/// Closed ring of points, pixel- or geo-space.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Polygon {
    points: Vec<[f64; 2]>,
}

impl Polygon {
    /// Four-corner ring from a box, ordered min-min, min-max, max-max,
    /// max-min. Degenerate boxes yield a zero-area ring, never an error.
    pub fn from_box(bbox: &PixelBox) -> Self {
        Self {
            points: vec![
                [bbox.min_x, bbox.min_y],
                [bbox.min_x, bbox.max_y],
                [bbox.max_x, bbox.max_y],
                [bbox.max_x, bbox.min_y],
            ],
        }
    }

    /// Ring from an open point list; the closing point is added at
    /// serialization time, so `points` must not repeat the first point.
    pub fn from_points(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Well-known-text serialization with an explicit closing point.
    pub fn to_wkt(&self) -> String {
        if self.points.is_empty() {
            return "POLYGON EMPTY".to_string();
        }
        let mut ring: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("{} {}", p[0], p[1]))
            .collect();
        // The closing point is always emitted, so degenerate rings whose
        // corners coincide still serialize as an explicitly closed ring.
        let first = &self.points[0];
        ring.push(format!("{} {}", first[0], first[1]));
        format!("POLYGON (({}))", ring.join(", "))
    }
}

/// Projects pixel boxes into pixel and geographic polygons for one raster.
pub struct GeoProjector {
    transform: GeoTransform,
    crs: Option<Box<dyn CrsTransform>>,
}

impl GeoProjector {
    pub fn new(transform: GeoTransform) -> Self {
        Self {
            transform,
            crs: None,
        }
    }

    /// Apply an additional CRS-to-CRS transform after the affine step.
    pub fn with_crs(mut self, crs: Box<dyn CrsTransform>) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Project one pixel coordinate into the output CRS.
    pub fn project(&self, px: f64, py: f64) -> (f64, f64) {
        let (x, y) = self.transform.pixel_to_projected(px, py);
        match &self.crs {
            Some(crs) => crs.transform(x, y),
            None => (x, y),
        }
    }

    /// Corner polygon of a box in pixel space.
    pub fn pixel_polygon(&self, bbox: &PixelBox) -> Polygon {
        Polygon::from_box(bbox)
    }

    /// Corner polygon of a box in the output CRS, same corner order as the
    /// pixel polygon.
    pub fn geo_polygon(&self, bbox: &PixelBox) -> Polygon {
        let points = Polygon::from_box(bbox)
            .points()
            .iter()
            .map(|p| {
                let (x, y) = self.project(p[0], p[1]);
                [x, y]
            })
            .collect();
        Polygon::from_points(points)
    }
}
