use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

#[derive(Debug, Default)]
pub struct CliSources {
    pub language_from_cli: bool,
    pub engine_mode_from_cli: bool,
    pub scale_factor_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            language_from_cli: value_from_cli(matches, "language"),
            engine_mode_from_cli: value_from_cli(matches, "engine_mode"),
            scale_factor_from_cli: value_from_cli(matches, "scale_factor"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

#[derive(Debug, Parser)]
#[command(
    name = "math-scanner",
    about = "Read printed math line by line and send regions for recognition",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Image to open on startup
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Tesseract recognition language
    #[arg(short = 'l', long = "language", default_value = "eng")]
    pub language: String,

    /// Tesseract OCR engine mode (0-3)
    #[arg(
        long = "engine-mode",
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub engine_mode: u8,

    /// Directory holding Tesseract language data
    #[arg(long = "tessdata-dir", value_name = "DIR")]
    pub tessdata_dir: Option<PathBuf>,

    /// Read character boxes from a file instead of running Tesseract
    #[arg(long = "boxes", value_name = "FILE")]
    pub boxes: Option<PathBuf>,

    /// Upscale the image by this integer factor before detection
    #[arg(
        long = "scale-factor",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub scale_factor: u32,

    /// Invert the image colours
    #[arg(long = "invert")]
    pub invert: bool,

    /// Convert the image to grayscale
    #[arg(long = "grayscale")]
    pub grayscale: bool,

    /// Black and white threshold (0-255)
    #[arg(long = "threshold", value_parser = clap::value_parser!(u8))]
    pub threshold: Option<u8>,

    /// Disable spoken feedback
    #[arg(long = "no-speech")]
    pub no_speech: bool,

    /// Print the reconstructed text and exit
    #[arg(long = "print", requires = "image")]
    pub print: bool,

    /// Write the reconstructed lines as JSON and exit
    #[arg(long = "dump-json", value_name = "FILE", requires = "image")]
    pub dump_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (CliArgs, CliSources) {
        let matches = CliArgs::command()
            .try_get_matches_from(std::iter::once("math-scanner").chain(args.iter().copied()))
            .unwrap();
        let cli = CliArgs::from_arg_matches(&matches).unwrap();
        (cli, CliSources::from_matches(&matches))
    }

    #[test]
    fn defaults_are_not_marked_as_explicit() {
        let (cli, sources) = parse(&["page.png"]);
        assert_eq!(cli.image, Some(PathBuf::from("page.png")));
        assert_eq!(cli.language, "eng");
        assert_eq!(cli.engine_mode, 3);
        assert!(!sources.language_from_cli);
        assert!(!sources.engine_mode_from_cli);
    }

    #[test]
    fn explicit_values_are_tracked() {
        let (cli, sources) = parse(&["--language", "ces", "--scale-factor", "2", "page.png"]);
        assert_eq!(cli.language, "ces");
        assert_eq!(cli.scale_factor, 2);
        assert!(sources.language_from_cli);
        assert!(sources.scale_factor_from_cli);
    }

    #[test]
    fn engine_mode_is_range_checked() {
        let result = CliArgs::command().try_get_matches_from(["math-scanner", "--engine-mode", "4"]);
        assert!(result.is_err());
    }
}
