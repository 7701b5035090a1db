//! Raster access capability.
//!
//! Raster decoding is an external collaborator: the pipeline only needs
//! dimensions, band layout, the affine geotransform, a projection descriptor
//! and pixel-aligned square sub-reads. Any backend (GeoTIFF reader, tile
//! server, in-memory buffer) can implement [`RasterSource`].

pub mod io;

pub use io::ImageRaster;

use crate::error::ScanError;
use crate::geo::GeoTransform;

/// Native interleaved band order of a raster.
///
/// The pipeline's canonical order is RGB; windows read from a BGR raster are
/// swapped before a detector sees them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandOrder {
    Rgb,
    Bgr,
}

/// Opaque handle to a georeferenced image.
///
/// Immutable for the duration of a pipeline run. `read_window` returns a
/// `size * size * band_count` interleaved buffer in the raster's native band
/// order; the window source performs the canonical-order correction.
pub trait RasterSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn band_count(&self) -> usize;

    fn band_order(&self) -> BandOrder {
        BandOrder::Rgb
    }

    fn geotransform(&self) -> GeoTransform;

    /// Coordinate-reference-system descriptor, empty when ungeoreferenced.
    fn projection_ref(&self) -> &str;

    /// Read the square sub-rectangle with top-left `(col, row)` into `out`.
    ///
    /// `out` is cleared and filled with `size * size * band_count` bytes,
    /// row-major, bands interleaved.
    fn read_window(
        &self,
        col: usize,
        row: usize,
        size: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), ScanError>;
}

/// Owned interleaved raster buffer, the in-memory [`RasterSource`] backend.
///
/// Used by tests and demos, and as the decoded form of image-file rasters.
#[derive(Clone, Debug)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    bands: usize,
    band_order: BandOrder,
    geotransform: GeoTransform,
    projection_ref: String,
    data: Vec<u8>,
}

impl MemoryRaster {
    /// Interleaved RGB buffer with an identity geotransform.
    pub fn rgb(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width * height * 3,
            "buffer length must be width * height * 3"
        );
        Self {
            width,
            height,
            bands: 3,
            band_order: BandOrder::Rgb,
            geotransform: GeoTransform::identity(),
            projection_ref: String::new(),
            data,
        }
    }

    pub fn with_geotransform(mut self, geotransform: GeoTransform) -> Self {
        self.geotransform = geotransform;
        self
    }

    pub fn with_projection_ref(mut self, projection_ref: impl Into<String>) -> Self {
        self.projection_ref = projection_ref.into();
        self
    }

    pub fn with_band_order(mut self, band_order: BandOrder) -> Self {
        self.band_order = band_order;
        self
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn band_order(&self) -> BandOrder {
        self.band_order
    }

    fn geotransform(&self) -> GeoTransform {
        self.geotransform
    }

    fn projection_ref(&self) -> &str {
        &self.projection_ref
    }

    fn read_window(
        &self,
        col: usize,
        row: usize,
        size: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), ScanError> {
        if col + size > self.width || row + size > self.height {
            return Err(ScanError::RasterRead {
                col,
                row,
                reason: format!(
                    "window of size {size} exceeds raster extent {}x{}",
                    self.width, self.height
                ),
            });
        }
        out.clear();
        out.reserve(size * size * self.bands);
        let row_stride = self.width * self.bands;
        for y in row..row + size {
            let start = y * row_stride + col * self.bands;
            out.extend_from_slice(&self.data[start..start + size * self.bands]);
        }
        Ok(())
    }
}
