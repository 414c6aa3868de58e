use geo::Intersects;
use geo_types::{MultiPolygon, Polygon};

use crate::types::{SkipReason, TracedContour};

/// Every contour touching at least one reference polygon, gathered as
/// separate members of a multipolygon. Members are not dissolved.
pub fn select_intersecting(
    contours: &[TracedContour],
    reference: &[Polygon<f64>],
) -> Result<MultiPolygon<f64>, SkipReason> {
    if contours.is_empty() {
        return Err(SkipReason::NoWater);
    }

    let accepted: Vec<Polygon<f64>> = contours
        .iter()
        .filter(|contour| reference.iter().any(|r| contour.intersects(r)))
        .cloned()
        .collect();

    if accepted.is_empty() {
        Err(SkipReason::NoIntersectingContour)
    } else {
        Ok(MultiPolygon::new(accepted))
    }
}
