use std::path::PathBuf;

use geo_types::{Geometry, LineString, Polygon};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::{
    error::Result,
    matching::Inspection,
    types::{RecordOutcome, ReferenceRecord},
};

const MATCHED_DIR: &str = "VECTOR";
const SKIPPED_DIR: &str = "NOVECTOR";

const WATER: Rgb<u8> = Rgb([90, 90, 90]);
const REFERENCE: Rgb<u8> = Rgb([255, 0, 0]);
const CONTOUR: Rgb<u8> = Rgb([255, 255, 0]);
const SELECTED: Rgb<u8> = Rgb([0, 0, 255]);

/// Dumps one PNG per inspected record for visual review.
///
/// Matched records land in `VECTOR/`, skipped ones in `NOVECTOR/`. Each image
/// shows the window mask with the reference outline in red, every traced
/// contour in yellow and the retained geometry in blue.
#[derive(Debug, Clone)]
pub struct VignetteWriter {
    root: PathBuf,
}

impl VignetteWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write the vignette of `inspection`. Returns `None` when the record
    /// had no window to draw.
    pub fn write(&self, record: &ReferenceRecord, inspection: &Inspection) -> Result<Option<PathBuf>> {
        let Some(window) = &inspection.window else {
            return Ok(None);
        };

        let mut canvas = RgbImage::from_fn(window.mask.width(), window.mask.height(), |x, y| {
            if window.mask.get_pixel(x, y).0[0] != 0 {
                WATER
            } else {
                Rgb([0, 0, 0])
            }
        });

        for polygon in &inspection.reference {
            draw_polygon(&mut canvas, polygon, REFERENCE);
        }
        for contour in &inspection.contours {
            draw_polygon(&mut canvas, contour, CONTOUR);
        }
        match &inspection.selected {
            Some(Geometry::Polygon(polygon)) => draw_polygon(&mut canvas, polygon, SELECTED),
            Some(Geometry::MultiPolygon(multi)) => {
                for polygon in multi {
                    draw_polygon(&mut canvas, polygon, SELECTED);
                }
            }
            _ => {}
        }

        let folder = match inspection.outcome {
            RecordOutcome::Matched(_) => MATCHED_DIR,
            RecordOutcome::Skipped { .. } => SKIPPED_DIR,
        };
        let dir = self.root.join(folder);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(file_name(record));
        canvas.save(&path)?;
        Ok(Some(path))
    }
}

fn file_name(record: &ReferenceRecord) -> String {
    let id: String = record
        .id
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!(
        "{}_{}_{}.png",
        id,
        record.date.as_deref().unwrap_or("nodate"),
        record.tile.as_deref().unwrap_or("notile")
    )
}

fn draw_polygon(canvas: &mut RgbImage, polygon: &Polygon<f64>, color: Rgb<u8>) {
    draw_ring(canvas, polygon.exterior(), color);
    for hole in polygon.interiors() {
        draw_ring(canvas, hole, color);
    }
}

fn draw_ring(canvas: &mut RgbImage, ring: &LineString<f64>, color: Rgb<u8>) {
    for line in ring.lines() {
        draw_line_segment_mut(
            canvas,
            (line.start.x as f32, line.start.y as f32),
            (line.end.x as f32, line.end.y as f32),
            color,
        );
    }
}
