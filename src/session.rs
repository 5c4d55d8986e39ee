//! The scanning session: the loaded image, its lines, the selected region and
//! the optional column split.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use math_scanner_ocr::{OcrEngine, OcrError};
use math_scanner_types::Line;
use thiserror::Error;
use tracing::info;

use crate::columns::{ColumnError, split_columns, split_point};
use crate::page::Page;
use crate::preprocess::{ImageProcessingSettings, process_image};
use crate::region::{BorderSide, Borders, CropRect, RegionSelector, SelectionError};

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open image {}: {source}", path.display())]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Columns(#[from] ColumnError),
}

/// Which image the session currently addresses.
#[derive(Debug)]
enum View {
    WholePage,
    Columns { columns: Vec<Page>, active: usize },
}

#[derive(Debug)]
struct Document {
    page: Page,
    view: View,
}

impl Document {
    fn active(&self) -> &Page {
        match &self.view {
            View::WholePage => &self.page,
            View::Columns { columns, active } => &columns[*active],
        }
    }
}

/// Owns everything one user works on. Borders are shared by whichever view is
/// active and are cleared whenever that view changes.
pub struct ScanSession {
    engine: Arc<dyn OcrEngine>,
    processing: ImageProcessingSettings,
    file_name: String,
    document: Option<Document>,
    selector: RegionSelector,
}

impl ScanSession {
    pub fn new(engine: Arc<dyn OcrEngine>, processing: ImageProcessingSettings) -> Self {
        Self {
            engine,
            processing,
            file_name: UNTITLED.to_string(),
            document: None,
            selector: RegionSelector::new(),
        }
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn has_image(&self) -> bool {
        self.document.is_some()
    }

    pub fn has_columns(&self) -> bool {
        self.column_count() > 0
    }

    pub fn column_count(&self) -> usize {
        match self.document.as_ref().map(|document| &document.view) {
            Some(View::Columns { columns, .. }) => columns.len(),
            _ => 0,
        }
    }

    pub fn active_column(&self) -> Option<usize> {
        match self.document.as_ref().map(|document| &document.view) {
            Some(View::Columns { active, .. }) => Some(*active),
            _ => None,
        }
    }

    /// Opens, preprocesses and segments an image file.
    pub fn load_image_from_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let image = image::open(path).map_err(|source| SessionError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let image = process_image(image, &self.processing);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_image(image, name)
    }

    /// Segments an already preprocessed image and makes it the whole-page view.
    ///
    /// The previous document stays in place if segmentation fails.
    pub fn load_image(
        &mut self,
        image: DynamicImage,
        name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let page = Page::segment(self.engine.as_ref(), image)?;
        self.file_name = name.into();
        info!(
            file = %self.file_name,
            lines = page.lines().len(),
            "loaded image"
        );
        self.document = Some(Document {
            page,
            view: View::WholePage,
        });
        self.selector.remove_all_borders();
        Ok(())
    }

    /// The page or column currently addressed, if an image is loaded.
    pub fn active_page(&self) -> Option<&Page> {
        self.document.as_ref().map(Document::active)
    }

    /// Whole page regardless of any column split.
    pub fn whole_page(&self) -> Option<&Page> {
        self.document.as_ref().map(|document| &document.page)
    }

    pub fn image_boxes(&self) -> &[Line] {
        self.active_page().map(Page::lines).unwrap_or(&[])
    }

    pub fn image_text(&self) -> &str {
        self.active_page().map(Page::text).unwrap_or("")
    }

    pub fn borders(&self) -> Borders {
        self.selector.borders()
    }

    pub fn place_border(
        &mut self,
        side: BorderSide,
        row: usize,
        column: usize,
    ) -> Result<bool, SelectionError> {
        let lines: &[Line] = match self.document.as_ref() {
            Some(document) => document.active().lines(),
            None => &[],
        };
        self.selector.place_border(side, lines, row, column)
    }

    pub fn place_left_border(&mut self, row: usize, column: usize) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Left, row, column)
    }

    pub fn place_right_border(&mut self, row: usize, column: usize) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Right, row, column)
    }

    pub fn place_top_border(&mut self, row: usize, column: usize) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Top, row, column)
    }

    pub fn place_bottom_border(&mut self, row: usize, column: usize) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Bottom, row, column)
    }

    pub fn remove_border(&mut self, side: BorderSide) -> bool {
        self.selector.remove_border(side)
    }

    pub fn remove_left_border(&mut self) -> bool {
        self.selector.remove_left_border()
    }

    pub fn remove_right_border(&mut self) -> bool {
        self.selector.remove_right_border()
    }

    pub fn remove_top_border(&mut self) -> bool {
        self.selector.remove_top_border()
    }

    pub fn remove_bottom_border(&mut self) -> bool {
        self.selector.remove_bottom_border()
    }

    pub fn remove_all_borders(&mut self) -> bool {
        self.selector.remove_all_borders()
    }

    pub fn switch_horizontal_borders(&mut self) {
        self.selector.switch_horizontal_borders();
    }

    pub fn switch_vertical_borders(&mut self) {
        self.selector.switch_vertical_borders();
    }

    /// # Panics
    ///
    /// Panics if no image is loaded.
    pub fn bordered_rect(&self) -> CropRect {
        let (width, height) = self.expect_active().dimensions();
        self.selector.bordered_region(width, height)
    }

    /// Crop of the active image inside the current borders.
    ///
    /// # Panics
    ///
    /// Panics if no image is loaded.
    pub fn get_bordered_region(&self) -> DynamicImage {
        self.selector.bordered_image(self.expect_active().image())
    }

    /// Splits the active image at the middle of its horizontal borders.
    ///
    /// The two halves replace the active column (or become the first columns
    /// of a whole page) and the left one becomes active. Borders are consumed.
    ///
    /// # Panics
    ///
    /// Panics if no image is loaded.
    pub fn split_to_columns(&mut self) -> Result<(), SessionError> {
        let source = self.expect_active();
        let (width, _) = source.dimensions();
        let (left, right) = self.selector.horizontal_extent(width);
        let halves = split_columns(self.engine.as_ref(), source, split_point(left, right))?;

        let Some(document) = self.document.as_mut() else {
            unreachable!("active page resolved above");
        };
        match &mut document.view {
            View::WholePage => {
                document.view = View::Columns {
                    columns: halves.into(),
                    active: 0,
                };
            }
            View::Columns { columns, active } => {
                columns.splice(*active..=*active, halves);
            }
        }
        self.selector.remove_all_borders();
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if there are no columns.
    pub fn switch_to_previous_column(&mut self) -> usize {
        self.step_column(|active, count| (active + count - 1) % count)
    }

    /// # Panics
    ///
    /// Panics if there are no columns.
    pub fn switch_to_next_column(&mut self) -> usize {
        self.step_column(|active, count| (active + 1) % count)
    }

    /// Returns to the whole page; reports whether any columns were discarded.
    pub fn cancel_columns(&mut self) -> bool {
        let had_columns = self.has_columns();
        if let Some(document) = self.document.as_mut() {
            document.view = View::WholePage;
        }
        self.selector.remove_all_borders();
        had_columns
    }

    fn step_column(&mut self, step: impl Fn(usize, usize) -> usize) -> usize {
        let view = self.document.as_mut().map(|document| &mut document.view);
        let Some(View::Columns { columns, active }) = view else {
            panic!("switching columns requires a column split");
        };
        *active = step(*active, columns.len());
        let current = *active;
        self.selector.remove_all_borders();
        current
    }

    fn expect_active(&self) -> &Page {
        match self.active_page() {
            Some(page) => page,
            None => panic!("no image loaded"),
        }
    }
}
