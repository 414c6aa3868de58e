use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, warn};

use crate::{
    error::{LakeError, Result},
    traits::ImagePreprocessor,
    transform::GeoTransform,
    types::RasterMask,
};

/// Parse an ESRI world file.
///
/// The six lines are `A, D, B, E, C, F` where `(C, F)` is the center of the
/// upper-left pixel; the returned transform is anchored on its outer corner.
pub fn parse_world_file(content: &str) -> Result<GeoTransform> {
    let values = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<f64>()
                .map_err(|_| LakeError::WorldFile(format!("not a number: '{}'", line)))
        })
        .collect::<Result<Vec<f64>>>()?;

    let [a, d, b, e, c, f] = values[..] else {
        return Err(LakeError::WorldFile(format!(
            "expected 6 values, found {}",
            values.len()
        )));
    };
    if a == 0.0 || e == 0.0 {
        return Err(LakeError::WorldFile("pixel size must be non-zero".to_string()));
    }

    Ok(GeoTransform::new(
        a,
        b,
        c - 0.5 * a - 0.5 * b,
        d,
        e,
        f - 0.5 * d - 0.5 * e,
    ))
}

pub fn read_world_file<P: AsRef<Path>>(path: P) -> Result<GeoTransform> {
    let content = std::fs::read_to_string(path)?;
    parse_world_file(&content)
}

/// Sidecar names a world file may have next to `raster`, most specific first:
/// `mask.tif` → `mask.tfw`, `mask.tifw`, `mask.wld`.
pub fn world_file_candidates(raster: &Path) -> Vec<PathBuf> {
    let Some(ext) = raster.extension().and_then(|e| e.to_str()) else {
        return vec![raster.with_extension("wld")];
    };

    let mut candidates = Vec::new();
    let mut chars = ext.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        candidates.push(raster.with_extension(format!("{}{}w", first, last)));
    }
    candidates.push(raster.with_extension(format!("{}w", ext)));
    candidates.push(raster.with_extension("wld"));
    candidates
}

pub fn find_world_file(raster: &Path) -> Option<PathBuf> {
    world_file_candidates(raster).into_iter().find(|p| p.is_file())
}

/// Decode a single-band mask. 16-bit masks are binarized on non-zero values
/// since a plain depth conversion would flatten 0/1 data to 0.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let image = image::open(path.as_ref())?;
    Ok(match image {
        DynamicImage::ImageLuma16(buffer) => {
            GrayImage::from_fn(buffer.width(), buffer.height(), |x, y| {
                Luma([if buffer.get_pixel(x, y).0[0] != 0 { 255 } else { 0 }])
            })
        }
        other => other.to_luma8(),
    })
}

/// Load a mask, run it through `preprocessors` and attach its georeferencing.
///
/// The transform is taken from `transform` when given, otherwise from
/// `world_file`, otherwise from a sidecar next to the raster.
pub fn load_mask<P: AsRef<Path>>(
    path: P,
    transform: Option<GeoTransform>,
    world_file: Option<&Path>,
    preprocessors: &[Box<dyn ImagePreprocessor>],
) -> Result<RasterMask> {
    let path = path.as_ref();
    let transform = match (transform, world_file) {
        (Some(transform), _) => transform,
        (None, Some(world_file)) => read_world_file(world_file)?,
        (None, None) => {
            let world_file = find_world_file(path).ok_or_else(|| {
                LakeError::WorldFile(format!(
                    "no transform configured and no world file found next to {}",
                    path.display()
                ))
            })?;
            debug!(world_file = %world_file.display(), "using sidecar world file");
            read_world_file(world_file)?
        }
    };

    if transform.has_rotation() {
        warn!(
            b = transform.b,
            d = transform.d,
            "raster transform has rotation terms, they are ignored by the pixel mapping"
        );
    }

    let mut image = load_image(path)?;
    for preprocessor in preprocessors {
        image = preprocessor.preprocess(&image)?;
    }

    Ok(RasterMask::new(image, transform))
}
