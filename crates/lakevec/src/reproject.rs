use std::fmt;

use geo::MapCoords;
use geo_types::Coord;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::{
    error::{LakeError, Result},
    traits::Reprojector,
};

/// Resolve a CRS given either as a proj string or as `EPSG:<code>` for the
/// handful of codes the lake datasets use.
pub fn proj_definition(crs: &str) -> Result<String> {
    let crs = crs.trim();
    let Some(code) = crs
        .strip_prefix("EPSG:")
        .or_else(|| crs.strip_prefix("epsg:"))
    else {
        return Ok(crs.to_string());
    };

    let code: u32 = code
        .parse()
        .map_err(|_| LakeError::Reprojection(format!("invalid EPSG code '{}'", crs)))?;

    let definition = match code {
        4326 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
        3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
            .to_string(),
        2154 => "+proj=lcc +lat_0=46.5 +lon_0=3 +lat_1=49 +lat_2=44 +x_0=700000 +y_0=6600000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
            .to_string(),
        32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", code - 32600),
        32701..=32760 => format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            code - 32700
        ),
        _ => {
            return Err(LakeError::Reprojection(format!(
                "EPSG:{} is not built in, pass its proj string instead",
                code
            )));
        }
    };
    Ok(definition)
}

fn is_geographic(definition: &str) -> bool {
    ["+proj=longlat", "+proj=latlong", "+proj=lonlat", "+proj=latlon"]
        .iter()
        .any(|name| definition.contains(name))
}

/// Leaves coordinates untouched; used when both sides share a CRS.
#[derive(Debug, Clone, Default)]
pub struct IdentityReprojector;

impl Reprojector for IdentityReprojector {
    fn reproject(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        Ok(coord)
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Pure-Rust reprojection between two proj definitions.
///
/// Geographic coordinates are read and written in degrees.
pub struct ProjReprojector {
    source: Proj,
    target: Proj,
    source_definition: String,
    target_definition: String,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl fmt::Debug for ProjReprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjReprojector")
            .field("source", &self.source_definition)
            .field("target", &self.target_definition)
            .finish_non_exhaustive()
    }
}

impl ProjReprojector {
    pub fn new(source: &str, target: &str) -> Result<Self> {
        let source_definition = proj_definition(source)?;
        let target_definition = proj_definition(target)?;

        let source = Proj::from_proj_string(&source_definition).map_err(|e| {
            LakeError::Reprojection(format!("invalid source CRS '{}': {:?}", source_definition, e))
        })?;
        let target = Proj::from_proj_string(&target_definition).map_err(|e| {
            LakeError::Reprojection(format!("invalid target CRS '{}': {:?}", target_definition, e))
        })?;

        Ok(Self {
            source,
            target,
            source_is_geographic: is_geographic(&source_definition),
            target_is_geographic: is_geographic(&target_definition),
            source_definition,
            target_definition,
        })
    }
}

impl Reprojector for ProjReprojector {
    fn reproject(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.source_is_geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.source, &self.target, &mut point).map_err(|e| {
            LakeError::Reprojection(format!("({}, {}): {:?}", coord.x, coord.y, e))
        })?;

        Ok(if self.target_is_geographic {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }
}

/// Reprojector between two optional CRSs. Missing or identical definitions
/// mean the coordinates are already aligned.
pub fn reprojector(source: Option<&str>, target: Option<&str>) -> Result<Box<dyn Reprojector>> {
    match (source, target) {
        (Some(source), Some(target)) if proj_definition(source)? != proj_definition(target)? => {
            Ok(Box::new(ProjReprojector::new(source, target)?))
        }
        _ => Ok(Box::new(IdentityReprojector)),
    }
}

/// Reproject every coordinate of a geometry.
pub fn reproject_geometry<G>(geometry: &G, reprojector: &dyn Reprojector) -> Result<G::Output>
where
    G: MapCoords<f64, f64>,
{
    geometry.try_map_coords(|coord| reprojector.reproject(coord))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Polygon};

    #[test]
    fn test_epsg_lookup() {
        assert!(proj_definition("EPSG:4326").unwrap().contains("longlat"));
        assert!(proj_definition("EPSG:32631").unwrap().contains("+zone=31"));
        assert!(proj_definition("EPSG:32755").unwrap().contains("+south"));
        assert_eq!(proj_definition("+proj=utm +zone=33").unwrap(), "+proj=utm +zone=33");
        assert!(matches!(proj_definition("EPSG:9999999"), Err(LakeError::Reprojection(_))));
        assert!(matches!(proj_definition("EPSG:abc"), Err(LakeError::Reprojection(_))));
    }

    #[test]
    fn test_wgs84_to_web_mercator() {
        let reprojector = ProjReprojector::new("EPSG:4326", "EPSG:3857").unwrap();

        let origin = reprojector.reproject(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert!(origin.x.abs() < 1e-6 && origin.y.abs() < 1e-6);

        let edge = reprojector.reproject(Coord { x: 180.0, y: 0.0 }).unwrap();
        assert!((edge.x - 20_037_508.342789244).abs() < 1e-3);
    }

    #[test]
    fn test_utm_round_trip() {
        let forward = ProjReprojector::new("EPSG:4326", "EPSG:32631").unwrap();
        let backward = ProjReprojector::new("EPSG:32631", "EPSG:4326").unwrap();

        // Central meridian of zone 31 maps to the false easting
        let central = forward.reproject(Coord { x: 3.0, y: 0.0 }).unwrap();
        assert!((central.x - 500_000.0).abs() < 1e-3);
        assert!(central.y.abs() < 1e-3);

        let lake = Coord { x: 1.4437, y: 43.6043 };
        let back = backward.reproject(forward.reproject(lake).unwrap()).unwrap();
        assert!((back.x - lake.x).abs() < 1e-6);
        assert!((back.y - lake.y).abs() < 1e-6);
    }

    #[test]
    fn test_same_crs_is_identity() {
        let same = reprojector(Some("EPSG:4326"), Some("+proj=longlat +datum=WGS84 +no_defs")).unwrap();
        assert!(same.is_identity());
        assert!(reprojector(None, Some("EPSG:4326")).unwrap().is_identity());
        assert!(!reprojector(Some("EPSG:4326"), Some("EPSG:3857")).unwrap().is_identity());
    }

    #[test]
    fn test_reproject_geometry_maps_every_ring() {
        let square: Polygon<f64> = polygon![
            (x: 1.0, y: 43.0),
            (x: 2.0, y: 43.0),
            (x: 2.0, y: 44.0),
            (x: 1.0, y: 44.0),
        ];
        let reprojector = ProjReprojector::new("EPSG:4326", "EPSG:2154").unwrap();

        let projected = reproject_geometry(&square, &reprojector).unwrap();
        assert_eq!(projected.exterior().0.len(), square.exterior().0.len());
        // Lambert-93 eastings and northings for southern France
        assert!(projected.exterior().coords().all(|c| c.x > 400_000.0 && c.x < 700_000.0));
        assert!(projected.exterior().coords().all(|c| c.y > 6_150_000.0 && c.y < 6_400_000.0));

        let unchanged = reproject_geometry(&square, &IdentityReprojector).unwrap();
        assert_eq!(unchanged, square);
    }
}
