use image::{DynamicImage, GenericImageView};
use math_scanner_ocr::{OcrEngine, OcrError};
use math_scanner_types::{Line, lines_to_text};

use crate::segmenter::segment_image;

/// An image together with the lines read from it.
///
/// Used both for the whole page and for each column after a split.
#[derive(Debug, Clone)]
pub struct Page {
    image: DynamicImage,
    lines: Vec<Line>,
    text: String,
}

impl Page {
    pub fn segment(engine: &dyn OcrEngine, image: DynamicImage) -> Result<Self, OcrError> {
        let lines = segment_image(engine, &image)?;
        Ok(Self::from_parts(image, lines))
    }

    pub fn from_parts(image: DynamicImage, lines: Vec<Line>) -> Self {
        let text = lines_to_text(&lines);
        Self { image, lines, text }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
