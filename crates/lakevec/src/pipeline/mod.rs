pub mod builder;

use geo::{BoundingRect, Intersects};
use geo_types::MultiPolygon;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    algorithms::{InvertPreprocessor, ThresholdPreprocessor},
    config::RunConfig,
    error::Result,
    io::{load_mask, read_references, write_results},
    matching::LakeMatcher,
    reproject::{reproject_geometry, reprojector},
    traits::{ImagePreprocessor, Reprojector},
    types::{MatchResult, RasterMask, RecordOutcome, ReferenceRecord, RunSummary},
    vignette::VignetteWriter,
};

/// Results of one run, in input order, with their counters.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub results: Vec<MatchResult>,
    pub summary: RunSummary,
}

/// Drives the lake matcher over a whole reference dataset.
pub struct Pipeline {
    matcher: LakeMatcher,
    to_raster: Box<dyn Reprojector>,
    to_output: Box<dyn Reprojector>,
    parallel: bool,
    vignettes: Option<VignetteWriter>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        matcher: LakeMatcher,
        to_raster: Box<dyn Reprojector>,
        to_output: Box<dyn Reprojector>,
        parallel: bool,
        vignettes: Option<VignetteWriter>,
    ) -> Self {
        Self {
            matcher,
            to_raster,
            to_output,
            parallel,
            vignettes,
        }
    }

    pub fn matcher(&self) -> &LakeMatcher {
        &self.matcher
    }

    /// Match every reference record against the raster.
    ///
    /// References are reprojected to the raster CRS and filtered on the raster
    /// extent before matching; results are reprojected to the output CRS.
    /// Fails with a configuration error when the matching options are invalid.
    pub fn process(&self, raster: &RasterMask, records: &[ReferenceRecord]) -> Result<PipelineOutput> {
        self.matcher.config().validate()?;

        let mut summary = RunSummary {
            records: records.len(),
            ..RunSummary::default()
        };

        let candidates = self.candidates(raster, records)?;
        summary.in_extent = candidates.len();

        let outcomes: Vec<RecordOutcome> = if self.parallel {
            candidates
                .par_iter()
                .map(|record| self.process_record(record, raster))
                .collect::<Result<_>>()?
        } else {
            candidates
                .iter()
                .map(|record| self.process_record(record, raster))
                .collect::<Result<_>>()?
        };

        let mut results = Vec::new();
        for outcome in outcomes {
            summary.record(&outcome);
            if let RecordOutcome::Matched(mut result) = outcome {
                if !self.to_output.is_identity() {
                    result.geometry = reproject_geometry(&result.geometry, self.to_output.as_ref())?;
                }
                results.push(result);
            }
        }

        info!(
            records = summary.records,
            in_extent = summary.in_extent,
            matched = summary.matched,
            skipped = summary.skipped_total(),
            policy = %self.matcher.config().matching_policy,
            "vectorization finished"
        );

        Ok(PipelineOutput { results, summary })
    }

    /// Records in the raster CRS whose bounding box touches the raster extent.
    fn candidates(&self, raster: &RasterMask, records: &[ReferenceRecord]) -> Result<Vec<ReferenceRecord>> {
        let extent = raster.extent();
        let mut candidates = Vec::new();

        for record in records {
            let geometry: MultiPolygon<f64> = if self.to_raster.is_identity() {
                record.geometry.clone()
            } else {
                reproject_geometry(&record.geometry, self.to_raster.as_ref())?
            };

            let inside = geometry
                .bounding_rect()
                .map(|bounds| bounds.intersects(&extent))
                .unwrap_or(false);
            if !inside {
                debug!(id = %record.id, "reference outside the raster extent");
                continue;
            }

            candidates.push(ReferenceRecord {
                geometry,
                ..record.clone()
            });
        }

        Ok(candidates)
    }

    fn process_record(&self, record: &ReferenceRecord, raster: &RasterMask) -> Result<RecordOutcome> {
        let Some(vignettes) = &self.vignettes else {
            return self.matcher.match_record(record, raster);
        };

        let inspection = self.matcher.inspect(record, raster)?;
        if let Err(e) = vignettes.write(record, &inspection) {
            warn!(id = %record.id, error = %e, "failed to write vignette");
        }
        Ok(inspection.outcome)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} policy, {} execution, vignettes {}",
            self.matcher.config().matching_policy,
            if self.parallel { "parallel" } else { "sequential" },
            if self.vignettes.is_some() { "on" } else { "off" }
        )
    }
}

/// Run a full vectorization from configuration: load, match, write.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let mut preprocessors: Vec<Box<dyn ImagePreprocessor>> = vec![Box::new(ThresholdPreprocessor)];
    if config.invert_mask {
        preprocessors.push(Box::new(InvertPreprocessor));
    }

    let mut raster = load_mask(
        &config.raster,
        config.transform,
        config.world_file.as_deref(),
        &preprocessors,
    )?;
    if let Some(crs) = &config.raster_crs {
        raster = raster.with_crs(crs.clone());
    }
    info!(
        raster = %config.raster.display(),
        width = raster.width(),
        height = raster.height(),
        pixel_area = raster.transform().pixel_area(),
        water_pixels = raster.water_pixels(),
        "loaded mask"
    );

    let mut records = read_references(&config.references, &config.id_field)?;
    for record in &mut records {
        if config.date.is_some() {
            record.date = config.date.clone();
        }
        if config.tile.is_some() {
            record.tile = config.tile.clone();
        }
    }

    let mut builder = Pipeline::builder()
        .with_match_config(config.matching.clone())
        .with_reprojector_to_raster(reprojector(
            config.reference_crs.as_deref(),
            config.raster_crs.as_deref(),
        )?)
        .with_reprojector_to_output(reprojector(
            config.raster_crs.as_deref(),
            config.effective_output_crs(),
        )?)
        .parallel(config.parallel);
    if let Some(dir) = &config.vignette_dir {
        builder = builder.with_vignettes(dir);
    }
    let pipeline = builder.build();
    debug!("{}", pipeline.info());

    let output = pipeline.process(&raster, &records)?;
    write_results(&config.output, &output.results)?;
    info!(output = %config.output.display(), features = output.results.len(), "wrote results");

    Ok(output.summary)
}
