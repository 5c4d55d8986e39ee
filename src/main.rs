use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use math_scanner::cli::{CliArgs, CliSources, parse_cli};
use math_scanner::console::Console;
use math_scanner::recognizer::MathpixRecognizer;
use math_scanner::session::ScanSession;
use math_scanner::settings::{EffectiveSettings, resolve_settings};
use math_scanner::speech::narrator_for;
use math_scanner_ocr::{OcrEngine, StaticOcrEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "math_scanner=info";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let (cli, sources) = parse_cli();
    match run(cli, sources).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: CliArgs, sources: CliSources) -> Result<(), Box<dyn Error>> {
    let settings = resolve_settings(&cli, &sources)?;
    if let Some(path) = &settings.config_path {
        info!(path = %path.display(), "loaded configuration");
    }

    let engine = build_engine(&settings)?;
    let mut session = ScanSession::new(engine, settings.processing);
    if let Some(image) = &cli.image {
        session.load_image_from_file(image)?;
    }

    if cli.print || cli.dump_json.is_some() {
        if cli.print {
            println!("{}", session.image_text());
        }
        if let Some(path) = &cli.dump_json {
            let json = serde_json::to_vec_pretty(session.image_boxes())?;
            tokio::fs::write(path, json).await?;
            info!(path = %path.display(), "wrote lines as JSON");
        }
        return Ok(());
    }

    let recognizer = MathpixRecognizer::new(&settings.mathpix);
    if let Err(err) = &recognizer {
        warn!(error = %err, "remote recognition disabled");
    }
    let mut console = Console::new(session, narrator_for(&settings.speech), recognizer);
    console.run().await?;
    Ok(())
}

fn build_engine(settings: &EffectiveSettings) -> Result<Arc<dyn OcrEngine>, Box<dyn Error>> {
    if let Some(path) = &settings.boxes {
        info!(path = %path.display(), "replaying character boxes from file");
        return Ok(Arc::new(StaticOcrEngine::from_file(path)?));
    }
    tesseract_engine(settings)
}

#[cfg(feature = "engine-tesseract")]
fn tesseract_engine(settings: &EffectiveSettings) -> Result<Arc<dyn OcrEngine>, Box<dyn Error>> {
    let engine = math_scanner_ocr::TesseractOcrEngine::new(settings.engine.clone());
    engine.warm_up()?;
    info!(
        language = %engine.config().language,
        engine_mode = engine.config().engine_mode,
        "tesseract ready"
    );
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "engine-tesseract"))]
fn tesseract_engine(_: &EffectiveSettings) -> Result<Arc<dyn OcrEngine>, Box<dyn Error>> {
    warn!("built without a detection engine; no characters will be found");
    Ok(Arc::new(math_scanner_ocr::NoopOcrEngine))
}
