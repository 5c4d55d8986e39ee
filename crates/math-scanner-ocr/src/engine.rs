use std::fs;
use std::path::Path;

use crate::error::OcrError;
use crate::request::OcrRequest;
use crate::response::BoxFeed;

/// Common interface for character detection engines.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }

    /// Whether detection looks at the request image at all. Engines that
    /// replay a fixed feed return `false`, so a crop of the page cannot be
    /// read on its own.
    fn reads_image(&self) -> bool {
        true
    }

    /// Detects individual characters and returns their boxes as a raw feed.
    fn detect_boxes(&self, request: &OcrRequest<'_>) -> Result<BoxFeed, OcrError>;
}

/// Engine that never finds anything.
#[derive(Debug, Default)]
pub struct NoopOcrEngine;

impl OcrEngine for NoopOcrEngine {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn detect_boxes(&self, _: &OcrRequest<'_>) -> Result<BoxFeed, OcrError> {
        Ok(BoxFeed::empty())
    }
}

/// Replays a previously captured box feed regardless of the image it is given.
#[derive(Debug, Clone)]
pub struct StaticOcrEngine {
    feed: BoxFeed,
}

impl StaticOcrEngine {
    pub fn new(feed: BoxFeed) -> Self {
        Self { feed }
    }

    pub fn from_file(path: &Path) -> Result<Self, OcrError> {
        let raw = fs::read_to_string(path).map_err(|source| OcrError::Feed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BoxFeed::new(raw)))
    }
}

impl OcrEngine for StaticOcrEngine {
    fn name(&self) -> &'static str {
        "static"
    }

    fn reads_image(&self) -> bool {
        false
    }

    fn detect_boxes(&self, _: &OcrRequest<'_>) -> Result<BoxFeed, OcrError> {
        Ok(self.feed.clone())
    }
}
