pub mod geojson;
pub mod raster;

pub use self::geojson::*;
pub use raster::*;
