//! # Lake Mask Vectorization Library
//!
//! Turns binary water masks derived from satellite imagery into lake polygons
//! and reconciles them with a reference lake database.
//!
//! For every reference lake the library crops an adaptive window of the mask
//! around it, traces the water contours in that window (holes included),
//! repairs invalid geometry and keeps the contours that belong to the lake.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: swap the contour tracer, mask preprocessing
//!   or reprojection by implementing a trait
//! - **Two Matching Policies**: union of all intersecting contours, or the
//!   single contour nearest to the window center
//! - **Pipeline System**: sequential or `rayon`-parallel runs over a whole
//!   reference dataset, with per-record outcomes and run statistics
//! - **GeoJSON Support**: references in, matched lakes out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lakevec::{Pipeline, MatchingPolicy, load_mask, read_references, write_results};
//!
//! let mask = load_mask("mask.tif", None, None, &[])?;
//! let references = read_references("lakes.geojson", "id")?;
//!
//! let pipeline = Pipeline::builder()
//!     .with_policy(MatchingPolicy::Union)
//!     .parallel(true)
//!     .build();
//!
//! let output = pipeline.process(&mask, &references)?;
//! write_results("lakes_vectorized.geojson", &output.results)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## From a configuration file
//!
//! ```rust,no_run
//! use lakevec::{pipeline, RunConfig};
//!
//! let config = RunConfig::from_file("lakevec.toml")?;
//! let summary = pipeline::run(&config)?;
//! println!("{} lakes matched", summary.matched);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod transform;
pub mod traits;
pub mod algorithms;
pub mod window;
pub mod matching;
pub mod config;
pub mod pipeline;

// Adapters
pub mod io;
pub mod reproject;
pub mod typed_geojson;
pub mod vignette;

// Re-exports for convenience
pub use error::{LakeError, Result};
pub use types::*;
pub use transform::{CoordinateMapper, GeoTransform};
pub use traits::*;
pub use algorithms::*;
pub use window::{CropWindow, Window, WindowExtractor};
pub use matching::{Inspection, LakeMatcher};
pub use config::{MatchConfig, MatchingPolicy, RunConfig};
pub use pipeline::{Pipeline, PipelineOutput, builder::PipelineBuilder};
pub use io::{
    find_world_file, load_image, load_mask, parse_world_file, read_references, read_world_file,
    references_from_str, results_to_geojson, results_to_geojson_string, world_file_candidates,
    write_results,
};
pub use reproject::{IdentityReprojector, ProjReprojector};
pub use vignette::VignetteWriter;
