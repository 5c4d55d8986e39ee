use std::path::PathBuf;

use math_scanner_types::BoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read box feed {}: {source}", path.display())]
    Feed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to stage image for recognition: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed box record: {0}")]
    Record(#[from] BoxError),
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl OcrError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
