use geo_types::{Coord, Rect};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Affine pixel → geographic transform using GDAL coefficient order:
/// `x = a * col + b * row + c`, `y = d * col + e * row + f`.
///
/// `(c, f)` is the outer corner of the upper-left pixel. North-up rasters have
/// `b = d = 0` and a negative `e`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform from the upper-left corner and the pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self::new(pixel_size, 0.0, origin_x, 0.0, -pixel_size, origin_y)
    }

    pub fn has_rotation(&self) -> bool {
        self.b != 0.0 || self.d != 0.0
    }

    /// Area of one pixel in geographic units.
    pub fn pixel_area(&self) -> f64 {
        (self.a * self.e - self.b * self.d).abs()
    }
}

/// Converts between geographic coordinates and the pixel grid of one raster.
///
/// Pixel indices are saturated to `[0, width]` x `[0, height]`: points outside
/// the raster land on its edge instead of being rejected. Callers that need to
/// know whether a point was actually inside must check [`Self::extent`].
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper<'a> {
    transform: &'a GeoTransform,
    width: u32,
    height: u32,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(transform: &'a GeoTransform, width: u32, height: u32) -> Self {
        Self {
            transform,
            width,
            height,
        }
    }

    pub fn transform(&self) -> &GeoTransform {
        self.transform
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Geographic point to `(col, row)`, rounded half-to-even and clamped.
    pub fn to_pixel(&self, point: Coord<f64>) -> (u32, u32) {
        let t = self.transform;
        let col = ((point.x - t.c) / t.a).round_ties_even();
        let row = ((t.f - point.y) / -t.e).round_ties_even();
        (
            col.clamp(0.0, self.width as f64) as u32,
            row.clamp(0.0, self.height as f64) as u32,
        )
    }

    pub fn to_pixels<I>(&self, points: I) -> Vec<(u32, u32)>
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        points.into_iter().map(|p| self.to_pixel(p)).collect()
    }

    /// Pixel position (`x` = column, `y` = row) to geographic coordinates.
    pub fn to_geo(&self, pixel: Coord<f64>) -> Coord<f64> {
        let t = self.transform;
        Coord {
            x: t.c + pixel.x * t.a,
            y: t.f + pixel.y * t.e,
        }
    }

    pub fn to_geos<I>(&self, pixels: I) -> Vec<Coord<f64>>
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        pixels.into_iter().map(|p| self.to_geo(p)).collect()
    }

    /// Geographic footprint of the whole raster.
    pub fn extent(&self) -> Rect<f64> {
        Rect::new(
            self.to_geo(Coord { x: 0.0, y: 0.0 }),
            self.to_geo(Coord {
                x: self.width as f64,
                y: self.height as f64,
            }),
        )
    }
}
