use std::path::PathBuf;

pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_ENGINE_MODE: u8 = 3;

/// Recognition settings shared by every detection pass of a session, so column
/// halves are read the same way as the whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub data_directory: Option<PathBuf>,
    pub language: String,
    pub engine_mode: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_directory: None,
            language: DEFAULT_LANGUAGE.to_string(),
            engine_mode: DEFAULT_ENGINE_MODE,
        }
    }
}
