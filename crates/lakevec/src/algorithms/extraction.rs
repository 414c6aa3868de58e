use std::collections::{HashMap, HashSet};

use geo::Area;
use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use crate::{error::Result, traits::ContourTracer, types::TracedContour};

/// Border-following contour tracer that keeps the outer/hole hierarchy.
///
/// Every outer border becomes a polygon shell. A hole border is attached to
/// the outer border recorded as its parent and to nothing else, so an island
/// inside a lake inside an island yields two separate polygons.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalContourTracer;

impl ContourTracer for HierarchicalContourTracer {
    fn trace(&self, window: &GrayImage, min_area: f64) -> Result<Vec<TracedContour>> {
        let contours = find_contours::<i32>(window);
        if contours.is_empty() {
            return Ok(Vec::new());
        }

        let rings: Vec<Ring> = contours.iter().map(Ring::from_contour).collect();
        let holes_by_parent = hole_index(&contours);

        let mut polygons = Vec::new();
        for (idx, contour) in contours.iter().enumerate() {
            if contour.border_type == BorderType::Hole {
                continue;
            }

            let shell = &rings[idx];
            if !shell.is_polygonal() || shell.area < min_area {
                continue;
            }

            let holes = holes_by_parent
                .get(&idx)
                .into_iter()
                .flatten()
                .map(|&hole| &rings[hole])
                .filter(|hole| hole.is_polygonal() && hole.area >= min_area)
                .map(|hole| hole.line.clone())
                .collect();

            polygons.push(Polygon::new(shell.line.clone(), holes));
        }

        Ok(polygons)
    }
}

/// Parent contour index → its hole borders, built from the child → parent links.
fn hole_index(contours: &[Contour<i32>]) -> HashMap<usize, Vec<usize>> {
    let mut holes_by_parent: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, contour) in contours.iter().enumerate() {
        if contour.border_type != BorderType::Hole {
            continue;
        }
        if let Some(parent) = contour.parent {
            holes_by_parent.entry(parent).or_default().push(idx);
        }
    }
    holes_by_parent
}

struct Ring {
    line: LineString<f64>,
    distinct: usize,
    area: f64,
}

impl Ring {
    fn from_contour(contour: &Contour<i32>) -> Self {
        let distinct = contour
            .points
            .iter()
            .map(|p| (p.x, p.y))
            .collect::<HashSet<_>>()
            .len();

        let coords: Vec<Coord<f64>> = contour
            .points
            .iter()
            .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
            .collect();
        let line = LineString::new(coords);
        let area = Polygon::new(line.clone(), vec![]).unsigned_area();

        Self { line, distinct, area }
    }

    /// At least three distinct vertices enclosing a nonzero area.
    fn is_polygonal(&self) -> bool {
        self.distinct >= 3 && self.area > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        let img = GrayImage::new(64, 64);
        let polygons = HierarchicalContourTracer.trace(&img, 10.0).unwrap();
        assert!(polygons.is_empty());
    }

    #[test]
    fn test_ring_region_has_one_hole() {
        let mut img = GrayImage::new(100, 100);
        fill_rect(&mut img, 20, 20, 80, 80, 255);
        fill_rect(&mut img, 40, 40, 60, 60, 0);

        let polygons = HierarchicalContourTracer.trace(&img, 10.0).unwrap();
        assert_eq!(polygons.len(), 1, "ring must stay a single polygon");
        assert_eq!(polygons[0].interiors().len(), 1);

        // Shell runs through pixel centers 20..=79; the hole border hugs the
        // hole from the surrounding water pixels 39..=60, corners cut.
        let shell = Polygon::new(polygons[0].exterior().clone(), vec![]);
        assert!((shell.unsigned_area() - 59.0 * 59.0).abs() < 1e-6);
        let hole = Polygon::new(polygons[0].interiors()[0].clone(), vec![]);
        assert!(hole.unsigned_area() > 20.0 * 20.0 && hole.unsigned_area() <= 21.0 * 21.0);
    }

    #[test]
    fn test_speckle_below_min_area_is_dropped() {
        let mut img = GrayImage::new(50, 50);
        fill_rect(&mut img, 5, 5, 25, 25, 255);
        fill_rect(&mut img, 40, 40, 42, 42, 255);

        let polygons = HierarchicalContourTracer.trace(&img, 10.0).unwrap();
        assert_eq!(polygons.len(), 1);

        let unfiltered = HierarchicalContourTracer.trace(&img, 0.0).unwrap();
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn test_small_hole_is_dropped_but_shell_kept() {
        let mut img = GrayImage::new(60, 60);
        fill_rect(&mut img, 10, 10, 50, 50, 255);
        img.put_pixel(30, 30, Luma([0u8]));

        let polygons = HierarchicalContourTracer.trace(&img, 10.0).unwrap();
        assert_eq!(polygons.len(), 1);
        assert!(polygons[0].interiors().is_empty());
    }

    #[test]
    fn test_degenerate_contours_are_never_emitted() {
        let mut img = GrayImage::new(20, 20);
        img.put_pixel(3, 3, Luma([255u8]));
        fill_rect(&mut img, 8, 10, 15, 11, 255);

        let polygons = HierarchicalContourTracer.trace(&img, 0.0).unwrap();
        assert!(polygons.is_empty(), "single pixels and one-pixel lines enclose no area");
    }

    #[test]
    fn test_island_inside_hole_is_separate_polygon() {
        let mut img = GrayImage::new(100, 100);
        fill_rect(&mut img, 10, 10, 90, 90, 255);
        fill_rect(&mut img, 25, 25, 75, 75, 0);
        fill_rect(&mut img, 40, 40, 60, 60, 255);

        let polygons = HierarchicalContourTracer.trace(&img, 10.0).unwrap();
        assert_eq!(polygons.len(), 2);
        let with_holes = polygons.iter().filter(|p| !p.interiors().is_empty()).count();
        assert_eq!(with_holes, 1);
    }
}
