//! Sliding-window tiling of a raster.
//!
//! The grid is a lazy, finite, restartable sequence of square window origins
//! in row-major order: all columns of a row before the next row. Origins
//! advance by `stride` along each axis, so a stride smaller than the window
//! size produces overlapping windows.
//!
//! The legacy bound is a strict `origin + size < dimension`: when the stride
//! evenly divides the remaining extent, the final strip of windows is
//! silently dropped. That behavior is load-bearing for downstream recall
//! comparisons, so it stays the default ([`BoundaryPolicy::Truncate`]);
//! [`BoundaryPolicy::Extend`] additionally emits a flush-to-edge origin on
//! each axis for callers that need full coverage.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::raster::{BandOrder, RasterSource};

/// What happens at the raster's far edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Legacy strict-less-than bound; the final partial strip is never
    /// visited.
    #[default]
    Truncate,
    /// Also emit the last window flushed against the raster edge.
    Extend,
}

/// Window origin grid over a raster of known dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGrid {
    /// Square window edge length in pixels.
    pub window_size: usize,
    /// Step between consecutive origins along one axis.
    pub stride: usize,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

impl WindowGrid {
    pub fn new(window_size: usize, stride: usize) -> Self {
        Self {
            window_size,
            stride,
            boundary: BoundaryPolicy::default(),
        }
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    /// Origins along one axis of length `dim`.
    pub fn axis_origins(&self, dim: usize) -> AxisOrigins {
        AxisOrigins {
            dim,
            size: self.window_size,
            stride: self.stride,
            extend: self.boundary == BoundaryPolicy::Extend,
            next: 0,
            tail_emitted: false,
        }
    }

    /// Row-major `(col, row)` origin sequence; re-iterating yields the same
    /// sequence.
    pub fn origins(&self, width: usize, height: usize) -> Origins {
        let mut rows = self.axis_origins(height);
        let row = rows.next();
        Origins {
            grid: *self,
            width,
            rows,
            row,
            cols: self.axis_origins(width),
        }
    }

    /// Number of windows the grid produces.
    pub fn count(&self, width: usize, height: usize) -> usize {
        self.axis_origins(height).count() * self.axis_origins(width).count()
    }
}

/// Lazy origin sequence along one axis.
pub struct AxisOrigins {
    dim: usize,
    size: usize,
    stride: usize,
    extend: bool,
    next: usize,
    tail_emitted: bool,
}

impl Iterator for AxisOrigins {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next + self.size < self.dim {
            let origin = self.next;
            self.next += self.stride;
            return Some(origin);
        }
        if self.extend && !self.tail_emitted && self.dim >= self.size {
            self.tail_emitted = true;
            return Some(self.dim - self.size);
        }
        None
    }
}

/// Row-major `(col, row)` origin iterator.
pub struct Origins {
    grid: WindowGrid,
    width: usize,
    rows: AxisOrigins,
    row: Option<usize>,
    cols: AxisOrigins,
}

impl Iterator for Origins {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        loop {
            let row = self.row?;
            if let Some(col) = self.cols.next() {
                return Some((col, row));
            }
            self.row = self.rows.next();
            self.cols = self.grid.axis_origins(self.width);
        }
    }
}

/// One materialized window: origin, geometry and its pixel buffer in the
/// pipeline's canonical RGB order.
///
/// Windows are produced and consumed one at a time; they do not outlive the
/// iteration step that reads them.
#[derive(Clone, Debug)]
pub struct Window {
    pub origin_col: usize,
    pub origin_row: usize,
    pub size: usize,
    pub bands: usize,
    pub data: Vec<u8>,
}

impl Window {
    /// True when every byte of the buffer is identical (a fully blank
    /// window). The pipeline skips such windows before invoking a detector;
    /// the source still yields them.
    pub fn is_uniform(&self) -> bool {
        match self.data.first() {
            Some(&first) => self.data.iter().all(|&v| v == first),
            None => true,
        }
    }
}

/// Streams materialized windows off a raster, one at a time.
///
/// Keeps no state beyond the current scan position; a fresh source over the
/// same raster and grid yields the same sequence.
pub struct WindowSource<'a, R: RasterSource + ?Sized> {
    raster: &'a R,
    grid: WindowGrid,
    origins: Origins,
}

impl<'a, R: RasterSource + ?Sized> WindowSource<'a, R> {
    pub fn new(raster: &'a R, grid: WindowGrid) -> Self {
        let origins = grid.origins(raster.width(), raster.height());
        Self {
            raster,
            grid,
            origins,
        }
    }
}

impl<'a, R: RasterSource + ?Sized> Iterator for WindowSource<'a, R> {
    type Item = Result<Window, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (col, row) = self.origins.next()?;
        let size = self.grid.window_size;
        let bands = self.raster.band_count();
        let mut data = Vec::new();
        if let Err(err) = self.raster.read_window(col, row, size, &mut data) {
            return Some(Err(err));
        }
        if self.raster.band_order() == BandOrder::Bgr && bands >= 3 {
            for px in data.chunks_exact_mut(bands) {
                px.swap(0, 2);
            }
        }
        Some(Ok(Window {
            origin_col: col,
            origin_row: row,
            size,
            bands,
            data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::MemoryRaster;

    #[test]
    fn extend_grid_covers_the_full_extent() {
        // With (dim - size) an exact multiple of the stride, full coverage
        // needs the flush-to-edge origin that Extend emits.
        let grid = WindowGrid::new(1024, 256).with_boundary(BoundaryPolicy::Extend);
        let origins: Vec<_> = grid.origins(1280, 1280).collect();
        assert_eq!(origins, vec![(0, 0), (256, 0), (0, 256), (256, 256)]);
        assert_eq!(grid.count(1280, 1280), 4);
    }

    #[test]
    fn truncate_grid_stops_short_of_the_edge() {
        // Same geometry as above: the strict bound drops the origin whose
        // window would end flush with the raster edge.
        let grid = WindowGrid::new(1024, 256);
        let origins: Vec<_> = grid.origins(1280, 1280).collect();
        assert_eq!(origins, vec![(0, 0)]);
        assert_eq!(grid.count(1280, 1280), 1);
    }

    #[test]
    fn window_count_formula_holds() {
        // floor((H-S)/T + 1) * floor((W-S)/T + 1) with full edge coverage;
        // the strict default keeps one origin fewer per axis here because
        // the last stride step lands exactly on dim - size.
        let grid = WindowGrid::new(100, 30).with_boundary(BoundaryPolicy::Extend);
        let rows = grid.axis_origins(250).count();
        assert_eq!(rows, (250 - 100) / 30 + 1);
        assert_eq!(grid.count(250, 250), rows * rows);

        let strict = WindowGrid::new(100, 30);
        assert_eq!(strict.axis_origins(250).count(), rows - 1);
    }

    #[test]
    fn exact_multiple_drops_the_final_strip() {
        // 1024 + 512 + 512 == 2048: the origin 1024 fails the strict bound.
        let grid = WindowGrid::new(1024, 512);
        let origins: Vec<_> = grid.axis_origins(2048).collect();
        assert_eq!(origins, vec![0, 512]);
    }

    #[test]
    fn extend_policy_adds_the_flush_window() {
        let grid = WindowGrid::new(1024, 512).with_boundary(BoundaryPolicy::Extend);
        let origins: Vec<_> = grid.axis_origins(2048).collect();
        assert_eq!(origins, vec![0, 512, 1024]);

        // When the raster equals the window, Extend emits origin 0 once and
        // Truncate emits nothing.
        let tight = WindowGrid::new(64, 32).with_boundary(BoundaryPolicy::Extend);
        assert_eq!(tight.axis_origins(64).collect::<Vec<_>>(), vec![0]);
        let legacy = WindowGrid::new(64, 32);
        assert_eq!(legacy.axis_origins(64).count(), 0);
    }

    #[test]
    fn iteration_is_restartable() {
        let grid = WindowGrid::new(64, 32);
        let first: Vec<_> = grid.origins(200, 200).collect();
        let second: Vec<_> = grid.origins(200, 200).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn uniform_window_is_detected() {
        let blank = Window {
            origin_col: 0,
            origin_row: 0,
            size: 2,
            bands: 3,
            data: vec![7; 12],
        };
        assert!(blank.is_uniform());

        let mut data = vec![7; 12];
        data[5] = 8;
        let textured = Window {
            data,
            ..blank.clone()
        };
        assert!(!textured.is_uniform());
    }

    #[test]
    fn bgr_rasters_are_swapped_to_canonical_rgb() {
        // One red pixel stored as BGR: (b=10, g=20, r=30).
        let raster = MemoryRaster::rgb(2, 2, vec![10, 20, 30, 10, 20, 30, 10, 20, 30, 10, 20, 30])
            .with_band_order(BandOrder::Bgr);
        let grid = WindowGrid::new(2, 1).with_boundary(BoundaryPolicy::Extend);
        let window = WindowSource::new(&raster, grid).next().unwrap().unwrap();
        assert_eq!(&window.data[..3], &[30, 20, 10]);
    }

    #[test]
    fn source_streams_every_grid_origin() {
        let raster = MemoryRaster::rgb(300, 300, vec![0; 300 * 300 * 3]);
        let grid = WindowGrid::new(100, 50);
        let windows: Vec<_> = WindowSource::new(&raster, grid)
            .map(|w| w.unwrap())
            .collect();
        assert_eq!(windows.len(), grid.count(300, 300));
        assert_eq!(
            (windows[0].origin_col, windows[0].origin_row),
            grid.origins(300, 300).next().unwrap()
        );
    }
}
