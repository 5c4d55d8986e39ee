use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Luma};
use tracing::debug;

/// Adjustments applied to a freshly opened image before detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProcessingSettings {
    pub scale_factor: u32,
    pub invert: bool,
    pub grayscale: bool,
    /// Luma below the threshold turns black, the rest white.
    pub blackwhite_threshold: Option<u8>,
}

impl Default for ImageProcessingSettings {
    fn default() -> Self {
        Self {
            scale_factor: 1,
            invert: false,
            grayscale: false,
            blackwhite_threshold: None,
        }
    }
}

impl ImageProcessingSettings {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Scales, inverts, desaturates and thresholds, in that order.
pub fn process_image(image: DynamicImage, settings: &ImageProcessingSettings) -> DynamicImage {
    if settings.is_identity() {
        return image;
    }

    let mut image = image;
    if settings.scale_factor > 1 {
        let (width, height) = image.dimensions();
        image = image.resize_exact(
            width.saturating_mul(settings.scale_factor),
            height.saturating_mul(settings.scale_factor),
            FilterType::CatmullRom,
        );
    }
    if settings.invert {
        image.invert();
    }
    if settings.grayscale {
        image = image.grayscale();
    }
    if let Some(threshold) = settings.blackwhite_threshold {
        image = binarize(&image, threshold);
    }

    debug!(
        width = image.width(),
        height = image.height(),
        ?settings,
        "preprocessed image"
    );
    image
}

fn binarize(image: &DynamicImage, threshold: u8) -> DynamicImage {
    let mut luma = image.to_luma8();
    for Luma([value]) in luma.pixels_mut() {
        *value = if *value < threshold { 0 } else { 255 };
    }
    DynamicImage::ImageLuma8(luma)
}
