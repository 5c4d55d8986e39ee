//! Splitting a page into a left and a right column.

use image::GenericImageView;
use math_scanner_ocr::{OcrEngine, OcrError};
use thiserror::Error;
use tracing::info;

use crate::page::Page;

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("splitting a {width} pixel wide image after column {split} leaves an empty column")]
    EmptyColumn { split: u32, width: u32 },
    #[error("the {engine} engine replays fixed boxes and cannot read columns on their own")]
    FixedFeed { engine: &'static str },
    #[error("column recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Last pixel column of the left half for an inclusive `[left, right]` extent.
pub fn split_point(left: u32, right: u32) -> u32 {
    let (left, right) = if left <= right {
        (left, right)
    } else {
        (right, left)
    };
    left + (right - left) / 2
}

/// Cuts `source` after pixel column `middle` and reads both halves again.
///
/// The halves span `[0, middle + 1)` and `[middle + 1, width)` at full height.
/// Engines that do not read the image are refused before anything is cropped.
pub fn split_columns(
    engine: &dyn OcrEngine,
    source: &Page,
    middle: u32,
) -> Result<[Page; 2], ColumnError> {
    if !engine.reads_image() {
        return Err(ColumnError::FixedFeed {
            engine: engine.name(),
        });
    }
    let image = source.image();
    let (width, height) = image.dimensions();
    let boundary = middle.saturating_add(1);
    if boundary >= width {
        return Err(ColumnError::EmptyColumn {
            split: middle,
            width,
        });
    }

    let left = Page::segment(engine, image.crop_imm(0, 0, boundary, height))?;
    let right = Page::segment(engine, image.crop_imm(boundary, 0, width - boundary, height))?;
    info!(
        width,
        boundary,
        left_lines = left.lines().len(),
        right_lines = right.lines().len(),
        "split page into columns"
    );
    Ok([left, right])
}
