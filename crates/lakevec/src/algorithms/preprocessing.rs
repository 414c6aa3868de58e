use image::GrayImage;
use crate::{error::Result, traits::ImagePreprocessor};

/// Binarizes a mask: any non-zero value becomes 255, the rest 0.
///
/// Accepts both 0/1 and 0/255 masks.
#[derive(Debug, Clone, Default)]
pub struct ThresholdPreprocessor;

impl ImagePreprocessor for ThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::contrast::threshold(image, 0))
    }
}

/// Swaps water and background, for masks that flag land instead of water.
#[derive(Debug, Clone, Default)]
pub struct InvertPreprocessor;

impl ImagePreprocessor for InvertPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let mut inverted = image.clone();
        image::imageops::invert(&mut inverted);
        Ok(inverted)
    }
}
