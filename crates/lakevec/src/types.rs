use std::collections::BTreeMap;
use std::fmt;

use geo_types::{Geometry, MultiPolygon, Polygon, Rect};
use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::transform::{CoordinateMapper, GeoTransform};

/// A polygon in window-local pixel coordinates (`x` = column, `y` = row).
pub type TracedContour = Polygon<f64>;

/// Binary water mask with its georeferencing.
#[derive(Debug, Clone)]
pub struct RasterMask {
    image: GrayImage,
    transform: GeoTransform,
    crs: Option<String>,
}

impl RasterMask {
    pub fn new(image: GrayImage, transform: GeoTransform) -> Self {
        Self {
            image,
            transform,
            crs: None,
        }
    }

    /// Attach a CRS definition (proj string).
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn mapper(&self) -> CoordinateMapper<'_> {
        CoordinateMapper::new(&self.transform, self.width(), self.height())
    }

    pub fn extent(&self) -> Rect<f64> {
        self.mapper().extent()
    }

    /// Number of foreground pixels.
    pub fn water_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != 0).count()
    }
}

/// Identifier of a reference lake, kept as it appeared in the source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LakeId {
    Number(i64),
    Text(String),
}

impl fmt::Display for LakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LakeId::Number(n) => write!(f, "{}", n),
            LakeId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for LakeId {
    fn from(value: i64) -> Self {
        LakeId::Number(value)
    }
}

impl From<&str> for LakeId {
    fn from(value: &str) -> Self {
        LakeId::Text(value.to_string())
    }
}

/// One lake from the reference database.
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    pub id: LakeId,
    /// Single-part references are stored as a one-element multipolygon.
    pub geometry: MultiPolygon<f64>,
    pub date: Option<String>,
    pub tile: Option<String>,
}

impl ReferenceRecord {
    pub fn new(id: impl Into<LakeId>, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            date: None,
            tile: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_tile(mut self, tile: impl Into<String>) -> Self {
        self.tile = Some(tile.into());
        self
    }
}

/// Geometry reconstructed from the mask for one reference lake.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub id: LakeId,
    pub date: Option<String>,
    pub tile: Option<String>,
    /// `MultiPolygon` for the union policy, `Polygon` for nearest-centroid.
    pub geometry: Geometry<f64>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, JsonSchema, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// The crop window is empty after clamping to the raster.
    NoOverlap,
    /// No water in the window (or under its center, for nearest-centroid).
    NoWater,
    /// Water was traced but none of it touches the reference lake.
    NoIntersectingContour,
    /// The closest contour centroid is beyond the configured tolerance.
    TooFar,
}

/// Terminal state of one reference record.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Matched(MatchResult),
    Skipped { id: LakeId, reason: SkipReason },
}

impl RecordOutcome {
    pub fn into_match(self) -> Option<MatchResult> {
        match self {
            RecordOutcome::Matched(result) => Some(result),
            RecordOutcome::Skipped { .. } => None,
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    /// Records handed to the pipeline
    pub records: usize,
    /// Records whose bounding box intersects the raster extent
    pub in_extent: usize,
    pub matched: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Matched(_) => self.matched += 1,
            RecordOutcome::Skipped { reason, .. } => {
                *self.skipped.entry(*reason).or_insert(0) += 1;
            }
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}
