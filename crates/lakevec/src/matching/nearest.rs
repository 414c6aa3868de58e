use geo::{Area, Centroid};
use geo_types::{Coord, Polygon};

use crate::types::{SkipReason, TracedContour};

/// The contour whose shell centroid is closest to `center`, provided it lies
/// within `tolerance` pixels.
pub fn select_nearest(
    contours: &[TracedContour],
    center: Coord<f64>,
    tolerance: f64,
) -> Result<Polygon<f64>, SkipReason> {
    let nearest = contours
        .iter()
        .filter_map(|contour| {
            shell_centroid(contour).map(|c| (contour, (c.x - center.x).hypot(c.y - center.y)))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        None => Err(SkipReason::NoWater),
        Some((_, distance)) if distance > tolerance => Err(SkipReason::TooFar),
        Some((contour, _)) => Ok(contour.clone()),
    }
}

/// Area centroid of the outer ring, holes ignored.
fn shell_centroid(contour: &TracedContour) -> Option<Coord<f64>> {
    let shell = Polygon::new(contour.exterior().clone(), vec![]);
    if shell.unsigned_area() == 0.0 {
        return None;
    }
    shell.centroid().map(|p| p.0)
}
