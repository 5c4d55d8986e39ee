use std::fmt;

use image::{DynamicImage, GenericImageView};

/// Image handed to a character detection engine.
#[derive(Clone, Copy)]
pub struct OcrRequest<'a> {
    image: &'a DynamicImage,
}

impl<'a> OcrRequest<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &'a DynamicImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl fmt::Debug for OcrRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.image.dimensions();
        f.debug_struct("OcrRequest")
            .field("width", &width)
            .field("height", &height)
            .field("color", &self.image.color())
            .finish()
    }
}
