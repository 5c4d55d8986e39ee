mod backends;
mod config;
mod engine;
mod error;
mod request;
mod response;

#[cfg(feature = "engine-tesseract")]
pub use backends::tesseract::TesseractOcrEngine;
pub use config::{DEFAULT_ENGINE_MODE, DEFAULT_LANGUAGE, EngineConfig};
pub use engine::{NoopOcrEngine, OcrEngine, StaticOcrEngine};
pub use error::OcrError;
pub use request::OcrRequest;
pub use response::{BOX_RECORD_FIELDS, BoxFeed};
