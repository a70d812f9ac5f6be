pub mod chatvrm;

use crate::error::{SpeakError, SpeakResult};
use async_trait::async_trait;
use serde::Serialize;

/// Body of one synthesis call, in the remote API's casing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker_id: u32,
    pub speed_scale: f64,
}

impl SynthesisRequest {
    pub const DEFAULT_SPEAKER_ID: u32 = 1;
    pub const DEFAULT_SPEED_SCALE: f64 = 1.0;

    pub fn new(text: impl Into<String>, speaker_id: u32, speed_scale: f64) -> SpeakResult<Self> {
        let request = Self {
            text: text.into(),
            speaker_id,
            speed_scale,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> SpeakResult<()> {
        if self.text.trim().is_empty() {
            return Err(SpeakError::Validation("text is required".to_string()));
        }
        Ok(())
    }
}

/// Decoded WAV returned by a backend.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Trait that all speech synthesis backends must implement.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Returns the decoded WAV for `request`
    async fn synthesize(&self, request: &SynthesisRequest) -> SpeakResult<SynthesizedAudio>;

    /// Returns the unique ID of the backend (e.g., "chatvrm")
    fn id(&self) -> &'static str;
}
