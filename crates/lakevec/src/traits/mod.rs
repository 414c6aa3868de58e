use geo_types::Coord;
use image::GrayImage;
use crate::{error::Result, types::TracedContour};

/// Trait for mask preprocessing (binarization and cleanup)
pub trait ImagePreprocessor: Send + Sync {
    /// Preprocess the input mask into the 0/255 convention
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for contour tracing algorithms
pub trait ContourTracer: Send + Sync {
    /// Trace polygons (shell plus holes) from a binary window.
    /// Shells and holes enclosing less than `min_area` pixels are dropped.
    fn trace(&self, window: &GrayImage, min_area: f64) -> Result<Vec<TracedContour>>;
}

/// Trait for coordinate reprojection between two CRSs
pub trait Reprojector: Send + Sync {
    fn reproject(&self, coord: Coord<f64>) -> Result<Coord<f64>>;

    /// True when `reproject` returns its input unchanged
    fn is_identity(&self) -> bool {
        false
    }
}
