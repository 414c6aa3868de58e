use std::path::{Path, PathBuf};

use clap::Args;
use lakevec::{LakeError, MatchingPolicy, RunConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Lake(#[from] LakeError),
    #[error("Missing --{0} (or a config file providing it)")]
    MissingArgument(&'static str),
}

/// Flags of the `run` subcommand. Each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// TOML or JSON run configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Binary water mask
    #[arg(short, long)]
    pub raster: Option<PathBuf>,
    /// Reference lakes (GeoJSON)
    #[arg(long)]
    pub references: Option<PathBuf>,
    /// Output GeoJSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// World file of the raster (defaults to the sidecar)
    #[arg(long)]
    pub world_file: Option<PathBuf>,
    /// Treat zero pixels as water
    #[arg(long)]
    pub invert: bool,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub tile: Option<String>,
    /// Property holding the reference identifier
    #[arg(long)]
    pub id_field: Option<String>,
    /// CRS of the raster (proj string or EPSG:<code>)
    #[arg(long)]
    pub raster_crs: Option<String>,
    /// CRS of the reference dataset
    #[arg(long)]
    pub reference_crs: Option<String>,
    /// CRS of the output (defaults to the reference CRS)
    #[arg(long)]
    pub output_crs: Option<String>,
    /// Matching policy: union or nearest_centroid
    #[arg(long)]
    pub policy: Option<String>,
    #[arg(long)]
    pub min_area: Option<f64>,
    #[arg(long)]
    pub buffer_floor: Option<f64>,
    #[arg(long)]
    pub buffer_fraction: Option<f64>,
    #[arg(long)]
    pub centroid_tolerance: Option<f64>,
    /// Process records on all cores
    #[arg(long)]
    pub parallel: bool,
    /// Write inspection PNGs under this directory
    #[arg(long)]
    pub vignettes: Option<PathBuf>,
}

impl RunArgs {
    /// Merge the config file (if any) with the command-line overrides.
    pub fn resolve(&self) -> Result<RunConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::new(
                self.raster.clone().ok_or(CliError::MissingArgument("raster"))?,
                self.references.clone().ok_or(CliError::MissingArgument("references"))?,
                self.output.clone().ok_or(CliError::MissingArgument("output"))?,
            ),
        };

        if let Some(raster) = &self.raster {
            config.raster = raster.clone();
        }
        if let Some(references) = &self.references {
            config.references = references.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        override_with(&mut config.world_file, self.world_file.clone());
        override_with(&mut config.date, self.date.clone());
        override_with(&mut config.tile, self.tile.clone());
        override_with(&mut config.raster_crs, self.raster_crs.clone());
        override_with(&mut config.reference_crs, self.reference_crs.clone());
        override_with(&mut config.output_crs, self.output_crs.clone());
        override_with(&mut config.vignette_dir, self.vignettes.clone());
        if let Some(id_field) = &self.id_field {
            config.id_field = id_field.clone();
        }
        config.invert_mask |= self.invert;
        config.parallel |= self.parallel;

        let matching = &mut config.matching;
        if let Some(policy) = &self.policy {
            matching.matching_policy = MatchingPolicy::parse(policy)?;
        }
        if let Some(min_area) = self.min_area {
            matching.min_area = min_area;
        }
        if let Some(buffer_floor) = self.buffer_floor {
            matching.buffer_floor = buffer_floor;
        }
        if let Some(buffer_fraction) = self.buffer_fraction {
            matching.buffer_fraction = buffer_fraction;
        }
        if let Some(tolerance) = self.centroid_tolerance {
            matching.centroid_tolerance = tolerance;
        }

        config.validate()?;
        Ok(config)
    }
}

fn override_with<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Write a skeleton configuration, TOML or JSON by extension.
pub fn write_skeleton(path: &Path) -> Result<(), CliError> {
    let mut config = RunConfig::new("mask.tif", "lakes.geojson", "lakes_vectorized.geojson");
    config.raster_crs = Some("EPSG:32631".to_string());
    config.reference_crs = Some("EPSG:4326".to_string());

    let content = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => config.to_json()?,
        _ => config.to_toml()?,
    };
    std::fs::write(path, content).map_err(LakeError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> RunArgs {
        RunArgs {
            raster: Some("mask.tif".into()),
            references: Some("lakes.geojson".into()),
            output: Some("out.geojson".into()),
            ..RunArgs::default()
        }
    }

    #[test]
    fn test_resolve_from_flags() {
        let args = RunArgs {
            policy: Some("nearest_centroid".to_string()),
            centroid_tolerance: Some(3.0),
            parallel: true,
            ..flags()
        };

        let config = args.resolve().expect("Should resolve");
        assert_eq!(config.matching.matching_policy, MatchingPolicy::NearestCentroid);
        assert_eq!(config.matching.centroid_tolerance, 3.0);
        assert_eq!(config.matching.min_area, 10.0);
        assert!(config.parallel);
        assert_eq!(config.id_field, "id");
    }

    #[test]
    fn test_missing_raster() {
        let args = RunArgs {
            raster: None,
            ..flags()
        };
        assert!(matches!(args.resolve(), Err(CliError::MissingArgument("raster"))));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let args = RunArgs {
            policy: Some("biggest".to_string()),
            ..flags()
        };
        assert!(matches!(
            args.resolve(),
            Err(CliError::Lake(LakeError::Configuration(_)))
        ));
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("lakevec-cli-{}.toml", std::process::id()));
        write_skeleton(&path).unwrap();

        let args = RunArgs {
            config: Some(path.clone()),
            tile: Some("T31TCJ".to_string()),
            min_area: Some(4.0),
            ..RunArgs::default()
        };
        let config = args.resolve().unwrap();

        assert_eq!(config.raster, PathBuf::from("mask.tif"));
        assert_eq!(config.reference_crs.as_deref(), Some("EPSG:4326"));
        assert_eq!(config.tile.as_deref(), Some("T31TCJ"));
        assert_eq!(config.matching.min_area, 4.0);

        std::fs::remove_file(path).ok();
    }
}
