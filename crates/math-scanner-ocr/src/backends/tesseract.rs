use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use image::ImageFormat;
use tracing::debug;

use crate::config::EngineConfig;
use crate::{BoxFeed, OcrEngine, OcrError, OcrRequest};

const PROGRAM: &str = "tesseract";

/// Runs the `tesseract` command line tool in `makebox` mode.
#[derive(Debug, Clone)]
pub struct TesseractOcrEngine {
    config: EngineConfig,
}

impl TesseractOcrEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn command_args(&self, image_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image_path.into(),
            "stdout".into(),
            "-l".into(),
            self.config.language.as_str().into(),
            "--oem".into(),
            self.config.engine_mode.to_string().into(),
        ];
        if let Some(dir) = self.config.data_directory.as_deref() {
            args.push("--tessdata-dir".into());
            args.push(dir.into());
        }
        args.push("makebox".into());
        args
    }
}

impl OcrEngine for TesseractOcrEngine {
    fn name(&self) -> &'static str {
        PROGRAM
    }

    fn warm_up(&self) -> Result<(), OcrError> {
        let output = Command::new(PROGRAM)
            .arg("--version")
            .output()
            .map_err(|source| OcrError::Spawn {
                program: PROGRAM,
                source,
            })?;
        if !output.status.success() {
            return Err(OcrError::backend(format!(
                "{PROGRAM} --version exited with {}",
                output.status
            )));
        }
        Ok(())
    }

    fn detect_boxes(&self, request: &OcrRequest<'_>) -> Result<BoxFeed, OcrError> {
        let mut staged = tempfile::Builder::new()
            .prefix("math-scanner-")
            .suffix(".png")
            .tempfile()?;
        request
            .image()
            .write_to(staged.as_file_mut(), ImageFormat::Png)?;
        staged.flush()?;

        let started = Instant::now();
        let output = Command::new(PROGRAM)
            .args(self.command_args(staged.path()))
            .output()
            .map_err(|source| OcrError::Spawn {
                program: PROGRAM,
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::backend(format!(
                "{PROGRAM} failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            width = request.width(),
            height = request.height(),
            language = %self.config.language,
            records = raw.lines().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tesseract box detection finished"
        );
        Ok(BoxFeed::new(raw))
    }
}
