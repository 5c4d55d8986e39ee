use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use math_scanner_ocr::{DEFAULT_LANGUAGE, EngineConfig};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::{CliArgs, CliSources};
use crate::preprocess::ImageProcessingSettings;
use crate::recognizer::{MathpixSettings, normalize_credential};
use crate::speech::SpeechSettings;

const PROJECT_CONFIG_FILE: &str = "math-scanner.toml";
const APP_ID_ENV: &str = "MATHPIX_APP_ID";
const APP_KEY_ENV: &str = "MATHPIX_APP_KEY";
const MAX_ENGINE_MODE: u8 = 3;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    mathpix: Option<MathpixFileConfig>,
    tesseract: Option<TesseractFileConfig>,
    image: Option<ImageFileConfig>,
    speech: Option<SpeechFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MathpixFileConfig {
    app_id: Option<String>,
    app_key: Option<String>,
    endpoint: Option<String>,
    formats: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TesseractFileConfig {
    data_directory: Option<String>,
    recognition_language: Option<String>,
    ocr_engine_mode: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageFileConfig {
    scale_factor: Option<u32>,
    invert: Option<bool>,
    grayscale: Option<bool>,
    blackwhite: Option<bool>,
    blackwhite_threshold: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpeechFileConfig {
    enabled: Option<bool>,
    module: Option<String>,
    language: Option<String>,
    voice: Option<String>,
    punctuation: Option<String>,
    pitch: Option<i32>,
    rate: Option<i32>,
    volume: Option<i32>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub engine: EngineConfig,
    pub boxes: Option<PathBuf>,
    pub processing: ImageProcessingSettings,
    pub mathpix: MathpixSettings,
    pub speech: SpeechSettings,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for '{field}'{}", located(path.as_deref()))]
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    #[error("config file {} does not exist", path.display())]
    NotFound { path: PathBuf },
}

fn located(path: Option<&Path>) -> String {
    path.map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path, |key| env::var(key).ok())
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return read_config(path.to_path_buf());
    }

    let candidates = [project_config_path(), default_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.exists() {
            return read_config(path);
        }
    }
    Ok((FileConfig::default(), None))
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok((config, Some(path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    let FileConfig {
        mathpix: file_mathpix,
        tesseract: file_tesseract,
        image: file_image,
        speech: file_speech,
    } = file;
    let file_mathpix = file_mathpix.unwrap_or_default();
    let file_tesseract = file_tesseract.unwrap_or_default();
    let file_image = file_image.unwrap_or_default();
    let file_speech = file_speech.unwrap_or_default();

    let mut language = normalize_string(Some(cli.language.clone()))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    if !sources.language_from_cli {
        if let Some(value) = normalize_string(file_tesseract.recognition_language) {
            language = value;
        }
    }

    let mut engine_mode = cli.engine_mode;
    if !sources.engine_mode_from_cli {
        if let Some(value) = file_tesseract.ocr_engine_mode {
            if value > MAX_ENGINE_MODE {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "tesseract.ocr_engine_mode",
                    value: value.to_string(),
                });
            }
            engine_mode = value;
        }
    }

    let data_directory = match cli.tessdata_dir.as_deref() {
        Some(dir) => Some(expand_home(dir)),
        None => normalize_string(file_tesseract.data_directory)
            .filter(|value| !value.eq_ignore_ascii_case("default"))
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref())),
    };

    let mut scale_factor = cli.scale_factor;
    if !sources.scale_factor_from_cli {
        if let Some(value) = file_image.scale_factor {
            if value < 1 {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "image.scale_factor",
                    value: value.to_string(),
                });
            }
            scale_factor = value;
        }
    }

    let file_threshold = if file_image.blackwhite.unwrap_or(false) {
        file_image.blackwhite_threshold
    } else {
        None
    };
    let processing = ImageProcessingSettings {
        scale_factor,
        invert: cli.invert || file_image.invert.unwrap_or(false),
        grayscale: cli.grayscale || file_image.grayscale.unwrap_or(false),
        blackwhite_threshold: cli.threshold.or(file_threshold),
    };

    let mut mathpix = MathpixSettings {
        app_id: normalize_credential(env_lookup(APP_ID_ENV))
            .or_else(|| normalize_credential(file_mathpix.app_id)),
        app_key: normalize_credential(env_lookup(APP_KEY_ENV))
            .or_else(|| normalize_credential(file_mathpix.app_key)),
        ..MathpixSettings::default()
    };
    if let Some(endpoint) = normalize_string(file_mathpix.endpoint) {
        mathpix.endpoint = endpoint;
    }
    if let Some(formats) = file_mathpix.formats {
        let formats: Vec<String> = formats
            .into_iter()
            .filter_map(|format| normalize_string(Some(format)))
            .collect();
        if formats.is_empty() {
            return Err(ConfigError::InvalidValue {
                path: config_path,
                field: "mathpix.formats",
                value: "[]".to_string(),
            });
        }
        mathpix.formats = formats;
    }
    if let Some(secs) = file_mathpix.timeout_secs {
        if secs == 0 {
            return Err(ConfigError::InvalidValue {
                path: config_path,
                field: "mathpix.timeout_secs",
                value: secs.to_string(),
            });
        }
        mathpix.timeout = Duration::from_secs(secs);
    }

    let defaults = SpeechSettings::default();
    let speech = SpeechSettings {
        enabled: !cli.no_speech && file_speech.enabled.unwrap_or(defaults.enabled),
        module: normalize_string(file_speech.module).unwrap_or(defaults.module),
        language: normalize_string(file_speech.language).unwrap_or(defaults.language),
        voice: normalize_string(file_speech.voice).unwrap_or(defaults.voice),
        punctuation: normalize_string(file_speech.punctuation).unwrap_or(defaults.punctuation),
        pitch: file_speech.pitch.unwrap_or(defaults.pitch),
        rate: file_speech.rate.unwrap_or(defaults.rate),
        volume: file_speech.volume.unwrap_or(defaults.volume),
    };

    Ok(EffectiveSettings {
        engine: EngineConfig {
            data_directory,
            language,
            engine_mode,
        },
        boxes: cli.boxes.as_deref().map(expand_home),
        processing,
        mathpix,
        speech,
        config_path,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "math-scanner", "math-scanner")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

/// Trimmed value, or `None` when nothing but whitespace is left.
fn normalize_string(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Config paths are relative to the file that names them.
fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let value = normalize_string(Some(value))?;
    let expanded = expand_home(Path::new(&value));
    match base {
        Some(base) if expanded.is_relative() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

/// Replaces a leading `~` component with the home directory when one is known.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), BaseDirs::new()) {
        (Ok(rest), Some(dirs)) if rest.as_os_str().is_empty() => dirs.home_dir().to_path_buf(),
        (Ok(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::{CommandFactory, FromArgMatches};
    use tempfile::NamedTempFile;

    use super::*;

    fn cli(args: &[&str]) -> (CliArgs, CliSources) {
        let matches = CliArgs::command()
            .try_get_matches_from(std::iter::once("math-scanner").chain(args.iter().copied()))
            .unwrap();
        let cli = CliArgs::from_arg_matches(&matches).unwrap();
        let sources = CliSources {
            language_from_cli: args.contains(&"--language"),
            engine_mode_from_cli: args.contains(&"--engine-mode"),
            scale_factor_from_cli: args.contains(&"--scale-factor"),
        };
        (cli, sources)
    }

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn resolve(
        args: &[&str],
        contents: &str,
        env: &[(&str, &str)],
    ) -> Result<EffectiveSettings, ConfigError> {
        let file = config_file(contents);
        let (cli, sources) = cli(args);
        let (config, path) = load_config(Some(file.path()))?;
        merge(&cli, &sources, config, path, |key| {
            env.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = resolve(&[], "", &[]).unwrap();
        assert_eq!(settings.engine.language, "eng");
        assert_eq!(settings.engine.engine_mode, 3);
        assert_eq!(settings.engine.data_directory, None);
        assert_eq!(settings.processing, ImageProcessingSettings::default());
        assert_eq!(settings.mathpix, MathpixSettings::default());
        assert_eq!(settings.speech, SpeechSettings::default());
    }

    #[test]
    fn file_values_fill_unset_flags() {
        let settings = resolve(
            &[],
            r#"
            [tesseract]
            recognition_language = "deu"
            ocr_engine_mode = 1
            data_directory = "/usr/share/tessdata"

            [image]
            scale_factor = 2
            invert = true
            blackwhite = true
            blackwhite_threshold = 140

            [speech]
            voice = "female2"
            rate = 20
            "#,
            &[],
        )
        .unwrap();
        assert_eq!(settings.engine.language, "deu");
        assert_eq!(settings.engine.engine_mode, 1);
        assert_eq!(
            settings.engine.data_directory,
            Some(PathBuf::from("/usr/share/tessdata"))
        );
        assert_eq!(settings.processing.scale_factor, 2);
        assert!(settings.processing.invert);
        assert_eq!(settings.processing.blackwhite_threshold, Some(140));
        assert_eq!(settings.speech.voice, "female2");
        assert_eq!(settings.speech.rate, 20);
        assert_eq!(settings.speech.module, "espeak-ng");
    }

    #[test]
    fn explicit_flags_beat_the_file() {
        let settings = resolve(
            &["--language", "ces", "--scale-factor", "4"],
            "[tesseract]\nrecognition_language = \"deu\"\n[image]\nscale_factor = 2\n",
            &[],
        )
        .unwrap();
        assert_eq!(settings.engine.language, "ces");
        assert_eq!(settings.processing.scale_factor, 4);
    }

    #[test]
    fn default_data_directory_means_unset() {
        let settings = resolve(&[], "[tesseract]\ndata_directory = \"default\"\n", &[]).unwrap();
        assert_eq!(settings.engine.data_directory, None);
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let file = config_file("[tesseract]\ndata_directory = \" tessdata \"\n");
        let (cli, sources) = cli(&["--boxes", "~other/page.box"]);
        let (config, path) = load_config(Some(file.path())).unwrap();
        let base = path.as_deref().and_then(Path::parent).map(Path::to_path_buf);
        let settings = merge(&cli, &sources, config, path, |_| None).unwrap();

        assert_eq!(
            settings.engine.data_directory,
            base.map(|dir| dir.join("tessdata"))
        );
        assert_eq!(settings.boxes, Some(PathBuf::from("~other/page.box")));
    }

    #[test]
    fn leading_tilde_is_the_home_directory() {
        let Some(dirs) = BaseDirs::new() else {
            return;
        };
        assert_eq!(expand_home(Path::new("~")), dirs.home_dir());
        assert_eq!(
            expand_home(Path::new("~/tessdata")),
            dirs.home_dir().join("tessdata")
        );
        assert_eq!(expand_home(Path::new("/tmp/~")), PathBuf::from("/tmp/~"));
    }

    #[test]
    fn threshold_requires_blackwhite() {
        let settings = resolve(
            &[],
            "[image]\nblackwhite = false\nblackwhite_threshold = 90\n",
            &[],
        )
        .unwrap();
        assert_eq!(settings.processing.blackwhite_threshold, None);
    }

    #[test]
    fn placeholder_credentials_are_ignored_and_env_wins() {
        let settings = resolve(
            &[],
            "[mathpix]\napp_id = \"your_app_id\"\napp_key = \"file-key\"\n",
            &[("MATHPIX_APP_KEY", "env-key")],
        )
        .unwrap();
        assert_eq!(settings.mathpix.app_id, None);
        assert_eq!(settings.mathpix.app_key.as_deref(), Some("env-key"));
        assert!(!settings.mathpix.has_credentials());
    }

    #[test]
    fn out_of_range_engine_mode_is_rejected() {
        let err = resolve(&[], "[tesseract]\nocr_engine_mode = 7\n", &[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "tesseract.ocr_engine_mode",
                ..
            }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = resolve(&[], "[mathpix]\ntimeout_secs = 0\n", &[]).unwrap_err();
        assert!(err.to_string().contains("mathpix.timeout_secs"));
    }

    #[test]
    fn no_speech_flag_disables_narration() {
        let settings = resolve(&["--no-speech"], "[speech]\nenabled = true\n", &[]).unwrap();
        assert!(!settings.speech.enabled);
    }

    #[test]
    fn missing_override_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/math-scanner.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let file = config_file("[tesseract\n");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
