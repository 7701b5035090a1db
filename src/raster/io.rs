//! File-backed rasters decoded through the `image` crate.
//!
//! Plain image formats carry no georeferencing, so loaded rasters default to
//! an identity geotransform and an empty projection descriptor; callers that
//! know the georeferencing (e.g. from a sidecar or a config file) attach it
//! with [`ImageRaster::with_geotransform`].

use std::path::Path;

use crate::error::ScanError;
use crate::geo::GeoTransform;
use crate::raster::{BandOrder, MemoryRaster, RasterSource};

/// Raster decoded from a PNG/JPEG/TIFF file into an owned RGB buffer.
pub struct ImageRaster {
    inner: MemoryRaster,
}

impl ImageRaster {
    /// Decode `path` into an RGB raster with an identity geotransform.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let img = image::open(path)
            .map_err(|e| ScanError::RasterOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .into_rgb8();
        let width = img.width() as usize;
        let height = img.height() as usize;
        let inner = MemoryRaster::rgb(width, height, img.into_raw());
        Ok(Self { inner })
    }

    pub fn with_geotransform(mut self, geotransform: GeoTransform) -> Self {
        self.inner = self.inner.with_geotransform(geotransform);
        self
    }

    pub fn with_projection_ref(mut self, projection_ref: impl Into<String>) -> Self {
        self.inner = self.inner.with_projection_ref(projection_ref);
        self
    }
}

impl RasterSource for ImageRaster {
    fn width(&self) -> usize {
        self.inner.width()
    }

    fn height(&self) -> usize {
        self.inner.height()
    }

    fn band_count(&self) -> usize {
        self.inner.band_count()
    }

    fn band_order(&self) -> BandOrder {
        self.inner.band_order()
    }

    fn geotransform(&self) -> GeoTransform {
        self.inner.geotransform()
    }

    fn projection_ref(&self) -> &str {
        self.inner.projection_ref()
    }

    fn read_window(
        &self,
        col: usize,
        row: usize,
        size: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), ScanError> {
        self.inner.read_window(col, row, size, out)
    }
}
