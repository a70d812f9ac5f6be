use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api/speak_text";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// ChatVRM speak_text endpoint
    pub api_url: String,
    /// Where WAV files are written. None = next to the executable.
    #[serde(default)]
    pub output_dir: Option<String>,
    /// JSON key in the API response holding the data URI
    pub audio_field: String,
    pub http_timeout_secs: u64,
    pub playback_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            output_dir: None,
            audio_field: "audio".to_string(),
            http_timeout_secs: 60,
            playback_timeout_secs: 120,
            log_level: "info".to_string(),
        }
    }
}

/// Values taken from the command line. They win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub output_dir: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub playback_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(&Overrides::default())
    }

    pub fn load(overrides: &Overrides) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("audio_field", defaults.audio_field)?
            .set_default("http_timeout_secs", defaults.http_timeout_secs)?
            .set_default("playback_timeout_secs", defaults.playback_timeout_secs)?
            .set_default("log_level", defaults.log_level)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("VrmSpeak").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.config/vrm-speak-mcp/VrmSpeak",
                    std::env::var("HOME").unwrap_or_default()
                ))
                .required(false),
            )
            // Merge with environment variables (e.g. VRM_SPEAK_API_URL)
            .add_source(config::Environment::with_prefix("VRM_SPEAK").try_parsing(true))
            .set_override_option("api_url", overrides.api_url.clone())?
            .set_override_option("output_dir", overrides.output_dir.clone())?
            .set_override_option("http_timeout_secs", overrides.http_timeout_secs)?
            .set_override_option("playback_timeout_secs", overrides.playback_timeout_secs)?
            .set_override_option("log_level", overrides.log_level.clone())?;

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.api_url = settings.api_url.trim_end_matches('/').to_string();
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if let Err(e) = reqwest::Url::parse(&self.api_url) {
            return Err(config::ConfigError::Message(format!(
                "Invalid api_url '{}': {}",
                self.api_url, e
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "http_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.playback_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "playback_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.audio_field.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "audio_field cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn playback_timeout(&self) -> Duration {
        Duration::from_secs(self.playback_timeout_secs)
    }

    /// The configured output directory, or the default one.
    pub fn output_directory(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_output_dir(),
        }
    }
}

/// First usable of `<exe dir>/assets`, `<data dir>/vrm-speak-mcp/assets`
/// and `./assets`.
pub fn default_output_dir() -> PathBuf {
    let mut candidates = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        candidates.push(exe_dir.join("assets"));
    }
    if let Some(data_dir) = dirs::data_dir() {
        candidates.push(data_dir.join("vrm-speak-mcp").join("assets"));
    }
    first_writable_dir(&candidates).unwrap_or_else(|| PathBuf::from("assets"))
}

/// The first candidate that exists (or can be created) and accepts a file.
pub fn first_writable_dir(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|dir| is_writable_dir(dir)).cloned()
}

fn is_writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() || !dir.is_dir() {
        return false;
    }
    // readonly() misses directories owned by another user
    let probe = dir.join(format!(".vrm-speak-write-test.{}", std::process::id()));
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(e) => {
            debug!("{} is not writable: {}", dir.display(), e);
            false
        }
    }
}
