use std::path::PathBuf;

use crate::{
    algorithms::HierarchicalContourTracer,
    config::{MatchConfig, MatchingPolicy},
    matching::LakeMatcher,
    pipeline::Pipeline,
    reproject::IdentityReprojector,
    traits::{ContourTracer, Reprojector},
    vignette::VignetteWriter,
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    config: MatchConfig,
    tracer: Option<Box<dyn ContourTracer>>,
    to_raster: Option<Box<dyn Reprojector>>,
    to_output: Option<Box<dyn Reprojector>>,
    parallel: bool,
    vignette_dir: Option<PathBuf>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: MatchConfig::default(),
            tracer: None,
            to_raster: None,
            to_output: None,
            parallel: false,
            vignette_dir: None,
        }
    }

    /// Replace the whole matching configuration
    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: MatchingPolicy) -> Self {
        self.config.matching_policy = policy;
        self
    }

    pub fn with_min_area(mut self, min_area: f64) -> Self {
        self.config.min_area = min_area;
        self
    }

    /// Set the contour tracer (replaces any existing one)
    pub fn set_contour_tracer<T>(mut self, tracer: T) -> Self
    where
        T: ContourTracer + 'static,
    {
        self.tracer = Some(Box::new(tracer));
        self
    }

    /// Reprojection applied to references before matching
    pub fn with_reprojector_to_raster(mut self, reprojector: Box<dyn Reprojector>) -> Self {
        self.to_raster = Some(reprojector);
        self
    }

    /// Reprojection applied to results before they are returned
    pub fn with_reprojector_to_output(mut self, reprojector: Box<dyn Reprojector>) -> Self {
        self.to_output = Some(reprojector);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Dump one inspection PNG per record under `dir`
    pub fn with_vignettes(mut self, dir: impl Into<PathBuf>) -> Self {
        self.vignette_dir = Some(dir.into());
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let tracer = self.tracer
            .unwrap_or_else(|| Box::new(HierarchicalContourTracer));

        Pipeline::new(
            LakeMatcher::with_tracer(self.config, tracer),
            self.to_raster.unwrap_or_else(|| Box::new(IdentityReprojector)),
            self.to_output.unwrap_or_else(|| Box::new(IdentityReprojector)),
            self.parallel,
            self.vignette_dir.map(VignetteWriter::new),
        )
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Result, types::TracedContour};
    use image::GrayImage;

    struct NoWaterTracer;

    impl ContourTracer for NoWaterTracer {
        fn trace(&self, _window: &GrayImage, _min_area: f64) -> Result<Vec<TracedContour>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = PipelineBuilder::default().build();
        assert_eq!(pipeline.matcher().config(), &MatchConfig::default());
        assert_eq!(pipeline.info(), "Pipeline: union policy, sequential execution, vignettes off");
    }

    #[test]
    fn test_builder_overrides() {
        let pipeline = Pipeline::builder()
            .with_policy(MatchingPolicy::NearestCentroid)
            .with_min_area(2.0)
            .set_contour_tracer(NoWaterTracer)
            .parallel(true)
            .with_vignettes("/tmp/vignettes")
            .build();

        assert_eq!(pipeline.matcher().config().matching_policy, MatchingPolicy::NearestCentroid);
        assert_eq!(pipeline.matcher().config().min_area, 2.0);
        assert_eq!(
            pipeline.info(),
            "Pipeline: nearest_centroid policy, parallel execution, vignettes on"
        );
    }
}
