//! Spoken feedback for console commands.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use tracing::{info, warn};

pub const SET: &str = "Set";
pub const REMOVED: &str = "Removed";
pub const INVALID_COORDINATES: &str = "Invalid coordinates";

const SPEECH_PROGRAM: &str = "spd-say";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSettings {
    pub enabled: bool,
    pub module: String,
    pub language: String,
    pub voice: String,
    pub punctuation: String,
    pub pitch: i32,
    pub rate: i32,
    pub volume: i32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            module: "espeak-ng".to_string(),
            language: "en".to_string(),
            voice: "male1".to_string(),
            punctuation: "some".to_string(),
            pitch: 10,
            rate: 2,
            volume: 100,
        }
    }
}

pub trait Narrator: Send + Sync {
    fn speak(&self, text: &str);
}

/// Speaks through speech-dispatcher's `spd-say`.
#[derive(Debug, Clone)]
pub struct SpeechDispatcher {
    settings: SpeechSettings,
}

impl SpeechDispatcher {
    pub fn new(settings: SpeechSettings) -> Self {
        Self { settings }
    }

    fn command_args(&self, text: &str) -> Vec<OsString> {
        let settings = &self.settings;
        let mut args: Vec<OsString> = Vec::with_capacity(16);
        for (flag, value) in [
            ("-o", settings.module.clone()),
            ("-l", settings.language.clone()),
            ("-t", settings.voice.clone()),
            ("-m", settings.punctuation.clone()),
            ("-p", settings.pitch.to_string()),
            ("-r", settings.rate.to_string()),
            ("-i", settings.volume.to_string()),
        ] {
            args.push(flag.into());
            args.push(value.into());
        }
        args.push("--".into());
        args.push(text.into());
        args
    }
}

impl Narrator for SpeechDispatcher {
    fn speak(&self, text: &str) {
        let status = Command::new(SPEECH_PROGRAM)
            .args(self.command_args(text))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(%status, "{SPEECH_PROGRAM} failed"),
            Err(err) => warn!(error = %err, "failed to run {SPEECH_PROGRAM}"),
        }
    }
}

/// Used when speech is disabled; the text only reaches the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn speak(&self, text: &str) {
        info!(text, "narration");
    }
}

pub fn narrator_for(settings: &SpeechSettings) -> Box<dyn Narrator> {
    if settings.enabled {
        Box::new(SpeechDispatcher::new(settings.clone()))
    } else {
        Box::new(SilentNarrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_passes_every_voice_setting() {
        let dispatcher = SpeechDispatcher::new(SpeechSettings::default());
        let args: Vec<String> = dispatcher
            .command_args("-x")
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-o", "espeak-ng", "-l", "en", "-t", "male1", "-m", "some", "-p", "10", "-r",
                "2", "-i", "100", "--", "-x",
            ]
        );
    }
}
