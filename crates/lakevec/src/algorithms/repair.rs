use geo::{Area, BooleanOps, Validation};
use geo_types::{LineString, MultiPolygon, Polygon};

/// Turns possibly invalid polygons (self-touching pixel contours, malformed
/// reference rings) into valid ones.
///
/// Valid polygons with a positive area pass through untouched. Invalid ones
/// are re-noded through a boolean overlay against an empty polygon, the
/// equivalent of a zero-distance buffer. When that splits the input into
/// several parts, only parts larger than `min_area` survive.
#[derive(Debug, Clone)]
pub struct GeometryRepairer {
    pub min_area: f64,
}

impl Default for GeometryRepairer {
    fn default() -> Self {
        Self { min_area: 10.0 }
    }
}

impl GeometryRepairer {
    pub fn new(min_area: f64) -> Self {
        Self { min_area }
    }

    pub fn repair<I>(&self, polygons: I) -> Vec<Polygon<f64>>
    where
        I: IntoIterator<Item = Polygon<f64>>,
    {
        polygons
            .into_iter()
            .flat_map(|polygon| self.repair_polygon(polygon))
            .collect()
    }

    /// Repair one polygon; the result may be empty or hold several parts.
    pub fn repair_polygon(&self, polygon: Polygon<f64>) -> Vec<Polygon<f64>> {
        if polygon.is_valid() {
            return if polygon.unsigned_area() > 0.0 {
                vec![polygon]
            } else {
                Vec::new()
            };
        }

        let MultiPolygon(parts) = renode(&polygon);
        let threshold = if parts.len() > 1 { self.min_area } else { 0.0 };

        parts
            .into_iter()
            .filter(|part| part.unsigned_area() > threshold)
            .collect()
    }
}

fn renode(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    let empty = Polygon::new(LineString::new(vec![]), vec![]);
    polygon.union(&empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
    }

    #[test]
    fn test_valid_polygon_is_unchanged() {
        let repairer = GeometryRepairer::default();
        let input = square(0.0, 0.0, 10.0);

        let once = repairer.repair(vec![input.clone()]);
        assert_eq!(once, vec![input.clone()]);

        let twice = repairer.repair(once);
        assert_eq!(twice, vec![input]);
    }

    #[test]
    fn test_bowtie_splits_into_valid_parts() {
        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
        ];
        assert!(!bowtie.is_valid());

        let parts = GeometryRepairer::new(10.0).repair_polygon(bowtie.clone());
        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert!(part.is_valid());
            assert!((part.unsigned_area() - 25.0).abs() < 1e-3);
        }

        // Both lobes fall under a larger threshold
        let none = GeometryRepairer::new(30.0).repair_polygon(bowtie);
        assert!(none.is_empty());
    }

    #[test]
    fn test_self_touching_contour_is_repaired() {
        // Two pixel blobs joined at one corner, traced as a single ring
        let touching = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 20.0, y: 10.0),
            (x: 20.0, y: 20.0),
            (x: 10.0, y: 20.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];

        let parts = GeometryRepairer::default().repair_polygon(touching);
        assert!(!parts.is_empty());
        let total: f64 = parts.iter().map(|p| p.unsigned_area()).sum();
        assert!((total - 200.0).abs() < 1e-3);
        assert!(parts.iter().all(|p| p.is_valid() && p.unsigned_area() > 0.0));
    }

    #[test]
    fn test_collapsed_polygon_contributes_nothing() {
        let flat = polygon![
            (x: 5.0, y: 5.0),
            (x: 6.0, y: 5.0),
            (x: 7.0, y: 5.0),
        ];
        assert!(GeometryRepairer::default().repair_polygon(flat).is_empty());
    }
}
