use std::path::{Path, PathBuf};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr, VariantNames};

use crate::{
    error::{LakeError, Result},
    transform::GeoTransform,
};

/// How traced contours are matched against a reference lake.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchingPolicy {
    /// Keep every contour touching the reference, as one multipolygon
    #[default]
    Union,

    /// Keep the single contour whose centroid is closest to the window center
    NearestCentroid,
}

impl MatchingPolicy {
    /// Parse a policy name, failing with a configuration error.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| {
            LakeError::Configuration(format!(
                "unknown matching_policy '{}', expected one of: {}",
                name,
                Self::VARIANTS.join(", ")
            ))
        })
    }

    pub fn names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Union => "Accept every traced contour intersecting the reference lake and emit them as one multipolygon",
            Self::NearestCentroid => "Emit the single contour whose centroid lies closest to the window center, within a pixel tolerance",
        }
    }
}

/// Options of the per-record matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum area in pixels to keep a traced contour, hole or repaired part
    pub min_area: f64,
    pub matching_policy: MatchingPolicy,
    /// Minimum crop margin in geographic units
    pub buffer_floor: f64,
    /// Crop margin as a fraction of the square root of the reference area
    pub buffer_fraction: f64,
    /// Maximum centroid distance in pixels for the nearest-centroid policy
    pub centroid_tolerance: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_area: 10.0,
            matching_policy: MatchingPolicy::Union,
            buffer_floor: 50.0,
            buffer_fraction: 0.2,
            centroid_tolerance: 5.0,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("min_area", self.min_area),
            ("buffer_floor", self.buffer_floor),
            ("buffer_fraction", self.buffer_fraction),
            ("centroid_tolerance", self.centroid_tolerance),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(LakeError::Configuration(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Everything one vectorization run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunConfig {
    /// Binary water mask (TIFF, PNG, ...)
    pub raster: PathBuf,
    /// World file georeferencing the raster; defaults to the sidecar next to it
    #[serde(default)]
    pub world_file: Option<PathBuf>,
    /// Explicit affine transform, overrides any world file
    #[serde(default)]
    pub transform: Option<GeoTransform>,
    /// Treat zero pixels as water
    #[serde(default)]
    pub invert_mask: bool,
    /// Reference lakes (GeoJSON FeatureCollection)
    pub references: PathBuf,
    /// Destination GeoJSON
    pub output: PathBuf,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tile: Option<String>,
    /// Property holding the reference identifier
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Proj string of the raster CRS
    #[serde(default)]
    pub raster_crs: Option<String>,
    /// Proj string of the reference dataset CRS
    #[serde(default)]
    pub reference_crs: Option<String>,
    /// Proj string of the output CRS; defaults to the reference CRS
    #[serde(default)]
    pub output_crs: Option<String>,
    /// Process records on the rayon thread pool
    #[serde(default)]
    pub parallel: bool,
    /// Write one inspection PNG per record under this directory
    #[serde(default)]
    pub vignette_dir: Option<PathBuf>,
    #[serde(default)]
    pub matching: MatchConfig,
}

fn default_id_field() -> String {
    "id".to_string()
}

impl RunConfig {
    pub fn new(
        raster: impl Into<PathBuf>,
        references: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            raster: raster.into(),
            world_file: None,
            transform: None,
            invert_mask: false,
            references: references.into(),
            output: output.into(),
            date: None,
            tile: None,
            id_field: default_id_field(),
            raster_crs: None,
            reference_crs: None,
            output_crs: None,
            parallel: false,
            vignette_dir: None,
            matching: MatchConfig::default(),
        }
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(LakeError::Configuration(format!(
                "unsupported config format for {}, use .toml or .json",
                path.display()
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RunConfig =
            toml::from_str(content).map_err(|e| LakeError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: RunConfig =
            serde_json::from_str(content).map_err(|e| LakeError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML, the format the CLI writes skeletons in.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LakeError::Configuration(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        if self.id_field.is_empty() {
            return Err(LakeError::Configuration("id_field must not be empty".to_string()));
        }
        if let Some(transform) = &self.transform {
            if transform.a == 0.0 || transform.e == 0.0 {
                return Err(LakeError::Configuration(
                    "transform pixel size (a, e) must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// CRS the results are written in.
    pub fn effective_output_crs(&self) -> Option<&str> {
        self.output_crs.as_deref().or(self.reference_crs.as_deref())
    }

    /// JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RunConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_names_parse() {
        assert_eq!(MatchingPolicy::parse("union").unwrap(), MatchingPolicy::Union);
        assert_eq!(
            MatchingPolicy::parse("nearest_centroid").unwrap(),
            MatchingPolicy::NearestCentroid
        );
        assert_eq!(MatchingPolicy::names(), &["union", "nearest_centroid"]);
        assert_eq!(MatchingPolicy::all(), vec![MatchingPolicy::Union, MatchingPolicy::NearestCentroid]);
        let name: &'static str = MatchingPolicy::NearestCentroid.into();
        assert_eq!(name, "nearest_centroid");
    }

    #[test]
    fn test_unknown_policy_is_configuration_error() {
        let err = MatchingPolicy::parse("largest").unwrap_err();
        assert!(matches!(err, LakeError::Configuration(_)));

        let toml = r#"
            raster = "mask.tif"
            references = "lakes.geojson"
            output = "out.geojson"

            [matching]
            matching_policy = "largest"
        "#;
        assert!(matches!(RunConfig::from_toml(toml), Err(LakeError::Configuration(_))));
    }

    #[test]
    fn test_toml_defaults() {
        let toml = r#"
            raster = "mask.tif"
            references = "lakes.geojson"
            output = "out.geojson"
            date = "20210415"
            tile = "T31TCJ"

            [matching]
            matching_policy = "nearest_centroid"
            min_area = 4.0
        "#;
        let config = RunConfig::from_toml(toml).expect("Should parse");

        assert_eq!(config.id_field, "id");
        assert_eq!(config.matching.matching_policy, MatchingPolicy::NearestCentroid);
        assert_eq!(config.matching.min_area, 4.0);
        assert_eq!(config.matching.buffer_floor, 50.0);
        assert_eq!(config.matching.buffer_fraction, 0.2);
        assert_eq!(config.matching.centroid_tolerance, 5.0);
        assert!(!config.parallel);
    }

    #[test]
    fn test_json_with_transform() {
        let json = r#"{
            "raster": "mask.png",
            "references": "lakes.geojson",
            "output": "out.geojson",
            "transform": {"a": 10.0, "b": 0.0, "c": 300000.0, "d": 0.0, "e": -10.0, "f": 5000000.0},
            "reference_crs": "+proj=longlat +datum=WGS84 +no_defs"
        }"#;
        let config = RunConfig::from_json(json).expect("Should parse");

        assert_eq!(config.transform, Some(GeoTransform::north_up(300_000.0, 5_000_000.0, 10.0)));
        assert_eq!(config.effective_output_crs(), Some("+proj=longlat +datum=WGS84 +no_defs"));
    }

    #[test]
    fn test_toml_skeleton_reloads() {
        let mut config = RunConfig::new("mask.tif", "lakes.geojson", "out.geojson");
        config.tile = Some("T31TCJ".to_string());
        config.transform = Some(GeoTransform::north_up(0.0, 100.0, 10.0));

        let text = config.to_toml().unwrap();
        assert!(text.contains("[matching]"));
        assert_eq!(RunConfig::from_toml(&text).unwrap(), config);
        assert_eq!(RunConfig::from_json(&config.to_json().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_negative_options_rejected() {
        let mut config = RunConfig::new("mask.tif", "lakes.geojson", "out.geojson");
        config.matching.buffer_fraction = -0.1;
        assert!(matches!(config.validate(), Err(LakeError::Configuration(_))));
    }

    #[test]
    fn test_schema_lists_policies() {
        let schema = serde_json::to_string(&RunConfig::schema()).unwrap();
        assert!(schema.contains("nearest_centroid"));
    }
}
