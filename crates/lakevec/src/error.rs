use thiserror::Error;

#[derive(Error, Debug)]
pub enum LakeError {
    #[error("Failed to load raster mask: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid world file: {0}")]
    WorldFile(String),

    #[error("Reference feature {index} has no usable identifier in field '{field}'")]
    MissingIdentifier { index: usize, field: String },

    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, LakeError>;
