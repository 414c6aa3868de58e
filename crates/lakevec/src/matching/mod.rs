//! Per-record matching of traced water against a reference lake.

pub mod nearest;
pub mod union;

use geo::MapCoords;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use tracing::debug;

use crate::{
    algorithms::{GeometryRepairer, HierarchicalContourTracer},
    config::{MatchConfig, MatchingPolicy},
    error::Result,
    traits::ContourTracer,
    transform::CoordinateMapper,
    types::{MatchResult, RasterMask, RecordOutcome, ReferenceRecord, SkipReason, TracedContour},
    window::{CropWindow, Window, WindowExtractor},
};

pub use nearest::select_nearest;
pub use union::select_intersecting;

/// Everything the matcher looked at for one record, in window pixel space.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub outcome: RecordOutcome,
    pub window: Option<Window>,
    /// Reference polygons mapped into the window
    pub reference: Vec<Polygon<f64>>,
    /// Repaired contours traced in the window
    pub contours: Vec<TracedContour>,
    /// Geometry retained by the policy, before georeferencing
    pub selected: Option<Geometry<f64>>,
}

impl Inspection {
    fn skipped(record: &ReferenceRecord, reason: SkipReason) -> Self {
        Self {
            outcome: RecordOutcome::Skipped {
                id: record.id.clone(),
                reason,
            },
            window: None,
            reference: Vec::new(),
            contours: Vec::new(),
            selected: None,
        }
    }
}

/// Crops, traces, repairs and selects water for reference lakes, one at a time.
pub struct LakeMatcher {
    config: MatchConfig,
    tracer: Box<dyn ContourTracer>,
    windows: WindowExtractor,
}

impl LakeMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self::with_tracer(config, Box::new(HierarchicalContourTracer))
    }

    pub fn with_tracer(config: MatchConfig, tracer: Box<dyn ContourTracer>) -> Self {
        let windows = WindowExtractor::new(config.buffer_floor, config.buffer_fraction);
        Self {
            config,
            tracer,
            windows,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Match one reference record against the raster. The reference must
    /// already be in the raster CRS.
    pub fn match_record(&self, record: &ReferenceRecord, raster: &RasterMask) -> Result<RecordOutcome> {
        Ok(self.inspect(record, raster)?.outcome)
    }

    /// Like [`match_record`](Self::match_record), keeping the intermediate
    /// window, reference and contours.
    pub fn inspect(&self, record: &ReferenceRecord, raster: &RasterMask) -> Result<Inspection> {
        let mapper = raster.mapper();
        let Some(window) = self.windows.extract(&record.geometry, raster) else {
            debug!(id = %record.id, "reference window does not overlap the raster");
            return Ok(Inspection::skipped(record, SkipReason::NoOverlap));
        };

        let reference = self.reference_in_window(&record.geometry, &mapper, &window.bounds);

        let (contours, decision) = match self.config.matching_policy {
            MatchingPolicy::Union => {
                let contours = self.trace(&window.mask, self.config.min_area)?;
                let decision = select_intersecting(&contours, &reference).map(Geometry::MultiPolygon);
                (contours, decision)
            }
            MatchingPolicy::NearestCentroid => {
                if window.center_value() == 0 {
                    (Vec::new(), Err(SkipReason::NoWater))
                } else {
                    let contours = self.trace(&window.mask, 0.0)?;
                    let decision = select_nearest(
                        &contours,
                        window.bounds.center(),
                        self.config.centroid_tolerance,
                    )
                    .map(Geometry::Polygon);
                    (contours, decision)
                }
            }
        };

        let (outcome, selected) = match decision {
            Ok(selected) => {
                let geometry = to_geographic(&selected, &mapper, &window.bounds);
                let outcome = RecordOutcome::Matched(MatchResult {
                    id: record.id.clone(),
                    date: record.date.clone(),
                    tile: record.tile.clone(),
                    geometry,
                });
                (outcome, Some(selected))
            }
            Err(reason) => {
                debug!(id = %record.id, %reason, contours = contours.len(), "record skipped");
                let outcome = RecordOutcome::Skipped {
                    id: record.id.clone(),
                    reason,
                };
                (outcome, None)
            }
        };

        Ok(Inspection {
            outcome,
            window: Some(window),
            reference,
            contours,
            selected,
        })
    }

    fn trace(&self, mask: &image::GrayImage, min_area: f64) -> Result<Vec<TracedContour>> {
        let traced = self.tracer.trace(mask, min_area)?;
        Ok(GeometryRepairer::new(min_area).repair(traced))
    }

    /// Reference exteriors snapped to the pixel grid, shifted to the window
    /// origin and repaired.
    fn reference_in_window(
        &self,
        reference: &MultiPolygon<f64>,
        mapper: &CoordinateMapper<'_>,
        bounds: &CropWindow,
    ) -> Vec<Polygon<f64>> {
        let origin = bounds.origin();
        let to_window = |ring: &LineString<f64>| -> LineString<f64> {
            ring.coords()
                .map(|&coord| {
                    let (col, row) = mapper.to_pixel(coord);
                    Coord {
                        x: col as f64 - origin.x,
                        y: row as f64 - origin.y,
                    }
                })
                .collect()
        };

        // Islands of the reference lake do not exclude water traced inside them
        let polygons = reference
            .iter()
            .map(|polygon| Polygon::new(to_window(polygon.exterior()), vec![]));

        GeometryRepairer::new(self.config.min_area).repair(polygons)
    }
}

/// Window pixel geometry back to raster CRS coordinates.
fn to_geographic(
    geometry: &Geometry<f64>,
    mapper: &CoordinateMapper<'_>,
    bounds: &CropWindow,
) -> Geometry<f64> {
    let origin = bounds.origin();
    geometry.map_coords(|coord| {
        mapper.to_geo(Coord {
            x: coord.x + origin.x,
            y: coord.y + origin.y,
        })
    })
}
