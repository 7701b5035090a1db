use sitescan::error::DetectorError;
use sitescan::raster::MemoryRaster;
use sitescan::types::{Detection, PixelBox};
use sitescan::window::Window;

/// Flat dark RGB raster with one saturated square at `bbox` (inclusive pixel
/// bounds).
pub fn bright_square_rgb(size: usize, bbox: (usize, usize, usize, usize)) -> MemoryRaster {
    let (min_x, min_y, max_x, max_y) = bbox;
    let mut data = vec![40u8; size * size * 3];
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let i = (y * size + x) * 3;
            data[i] = 255;
            data[i + 1] = 255;
            data[i + 2] = 255;
        }
    }
    MemoryRaster::rgb(size, size, data)
}

/// Deterministic stand-in detector: reports the bounding box of saturated
/// red-channel pixels in the window, if any.
///
/// A region touching the window border is presumed clipped and scored lower,
/// the way a real model is less confident about a partially visible object.
/// That keeps the fully-contained sighting as the NMS winner.
pub struct BrightRegionDetector {
    pub label: usize,
    pub score: f32,
    pub clipped_score: f32,
}

impl Default for BrightRegionDetector {
    fn default() -> Self {
        Self {
            label: 1,
            score: 0.95,
            clipped_score: 0.6,
        }
    }
}

impl sitescan::Detector for BrightRegionDetector {
    fn detect(&self, window: &Window) -> Result<Vec<Detection>, DetectorError> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for y in 0..window.size {
            for x in 0..window.size {
                if window.data[(y * window.size + x) * window.bands] == 255 {
                    bounds = Some(match bounds {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => {
                            (x0.min(x), y0.min(y), x1.max(x), y1.max(y))
                        }
                    });
                }
            }
        }
        Ok(bounds
            .map(|(x0, y0, x1, y1)| {
                let edge = window.size - 1;
                let clipped = x0 == 0 || y0 == 0 || x1 == edge || y1 == edge;
                Detection::new(
                    PixelBox::new(x0 as f64, y0 as f64, x1 as f64, y1 as f64),
                    self.label,
                    if clipped { self.clipped_score } else { self.score },
                )
            })
            .into_iter()
            .collect())
    }
}
