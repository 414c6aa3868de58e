use geo::{Area, BoundingRect};
use geo_types::{Coord, MultiPolygon};
use image::{imageops, GrayImage};

use crate::{transform::CoordinateMapper, types::RasterMask};

/// Pixel rectangle of the raster examined for one reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// Upper-left corner in raster pixel coordinates.
    pub fn origin(&self) -> Coord<f64> {
        Coord {
            x: self.col as f64,
            y: self.row as f64,
        }
    }

    /// Geometric center in window-local pixel coordinates.
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: self.width as f64 / 2.0,
            y: self.height as f64 / 2.0,
        }
    }
}

/// A crop window together with its slice of the mask.
#[derive(Debug, Clone)]
pub struct Window {
    pub bounds: CropWindow,
    pub mask: GrayImage,
}

impl Window {
    /// Mask value under the window center.
    pub fn center_value(&self) -> u8 {
        let x = (self.bounds.width / 2).min(self.bounds.width.saturating_sub(1));
        let y = (self.bounds.height / 2).min(self.bounds.height.saturating_sub(1));
        self.mask.get_pixel(x, y).0[0]
    }
}

/// Sizes crop windows from the reference footprint.
///
/// The margin is `max(buffer_floor, buffer_fraction * sqrt(area))` in
/// geographic units, so small lakes still tolerate registration offsets
/// between the reference database and the raster.
#[derive(Debug, Clone)]
pub struct WindowExtractor {
    pub buffer_floor: f64,
    pub buffer_fraction: f64,
}

impl Default for WindowExtractor {
    fn default() -> Self {
        Self {
            buffer_floor: 50.0,
            buffer_fraction: 0.2,
        }
    }
}

impl WindowExtractor {
    pub fn new(buffer_floor: f64, buffer_fraction: f64) -> Self {
        Self {
            buffer_floor,
            buffer_fraction,
        }
    }

    pub fn buffer(&self, area: f64) -> f64 {
        self.buffer_floor.max(self.buffer_fraction * area.sqrt())
    }

    /// Pixel window around `reference`, or `None` when it collapses after
    /// clamping to the raster (no overlap).
    pub fn crop_window(
        &self,
        reference: &MultiPolygon<f64>,
        mapper: &CoordinateMapper<'_>,
    ) -> Option<CropWindow> {
        let bounds = reference.bounding_rect()?;
        let buffer = self.buffer(reference.unsigned_area());

        let upper_left = mapper.to_pixel(Coord {
            x: bounds.min().x - buffer,
            y: bounds.max().y + buffer,
        });
        let lower_right = mapper.to_pixel(Coord {
            x: bounds.max().x + buffer,
            y: bounds.min().y - buffer,
        });

        let (col, col_end) = (upper_left.0.min(lower_right.0), upper_left.0.max(lower_right.0));
        let (row, row_end) = (upper_left.1.min(lower_right.1), upper_left.1.max(lower_right.1));
        if col_end == col || row_end == row {
            return None;
        }

        Some(CropWindow {
            col,
            row,
            width: col_end - col,
            height: row_end - row,
        })
    }

    pub fn extract(&self, reference: &MultiPolygon<f64>, raster: &RasterMask) -> Option<Window> {
        let bounds = self.crop_window(reference, &raster.mapper())?;
        let mask = imageops::crop_imm(raster.image(), bounds.col, bounds.row, bounds.width, bounds.height)
            .to_image();
        Some(Window { bounds, mask })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::GeoTransform;
    use geo_types::{polygon, MultiPolygon};
    use image::Luma;

    fn raster() -> RasterMask {
        // 1000 x 1000 pixels of 10 m, upper-left corner at (0, 10000)
        let mut image = GrayImage::new(1000, 1000);
        image.put_pixel(500, 500, Luma([255u8]));
        RasterMask::new(image, GeoTransform::north_up(0.0, 10_000.0, 10.0))
    }

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
        .into()
    }

    #[test]
    fn test_buffer_floor_and_fraction() {
        let extractor = WindowExtractor::default();
        assert_eq!(extractor.buffer(100.0), 50.0);
        assert!((extractor.buffer(1_000_000.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_lake_uses_fixed_margin() {
        let raster = raster();
        // 100 m square at (4950, 4950): 50 m margin on each side, 10 m pixels
        let window = WindowExtractor::default()
            .crop_window(&square(4950.0, 4950.0, 100.0), &raster.mapper())
            .expect("Should overlap");

        assert_eq!(window, CropWindow { col: 490, row: 490, width: 20, height: 20 });
    }

    #[test]
    fn test_extract_slices_mask() {
        let raster = raster();
        let window = WindowExtractor::default()
            .extract(&square(4950.0, 4950.0, 100.0), &raster)
            .expect("Should overlap");

        assert_eq!(window.mask.dimensions(), (20, 20));
        assert_eq!(window.mask.get_pixel(10, 10).0[0], 255);
        assert_eq!(window.center_value(), 255);
        assert_eq!(window.bounds.center(), Coord { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_window_clamped_at_raster_edge() {
        let raster = raster();
        let window = WindowExtractor::default()
            .crop_window(&square(-20.0, 9_950.0, 40.0), &raster.mapper())
            .expect("Should overlap");

        assert_eq!(window.col, 0);
        assert_eq!(window.row, 0);
        assert_eq!(window.width, 7);
        assert_eq!(window.height, 10);
    }

    #[test]
    fn test_reference_outside_raster_has_no_overlap() {
        let raster = raster();
        let extractor = WindowExtractor::default();

        assert!(extractor.crop_window(&square(20_000.0, 20_000.0, 100.0), &raster.mapper()).is_none());
        assert!(extractor.extract(&square(-5_000.0, 4_000.0, 100.0), &raster).is_none());
        assert!(extractor.extract(&MultiPolygon::new(vec![]), &raster).is_none());
    }
}
