//! The `speak_text` tool: argument schema, validation and result text.

use crate::backends::SynthesisRequest;
use crate::engine::{SpeakReport, SpeechEngine};
use crate::error::{SpeakError, SpeakResult, ToolCallError};
use crate::playback::PlaybackOutcome;
use crate::protocol::ToolDefinition;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

pub const TOOL_NAME: &str = "speak_text";

const TOOL_DESCRIPTION: &str =
    "Synthesize speech with a VRM character's voice, save it as a WAV file and optionally play it.";

fn default_speaker_id() -> u32 {
    SynthesisRequest::DEFAULT_SPEAKER_ID
}

fn default_speed_scale() -> f64 {
    SynthesisRequest::DEFAULT_SPEED_SCALE
}

fn default_auto_play() -> bool {
    true
}

/// Arguments as they arrive in `tools/call`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpeakTextArgs {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_speaker_id")]
    pub speaker_id: u32,
    #[serde(default = "default_speed_scale")]
    pub speed_scale: f64,
    #[serde(default = "default_auto_play")]
    pub auto_play: bool,
}

impl SpeakTextArgs {
    /// Apply defaults and reject anything that cannot become a request.
    pub fn parse(arguments: Value) -> SpeakResult<Self> {
        let arguments = match arguments {
            Value::Null => json!({}),
            Value::Object(_) => arguments,
            other => {
                return Err(SpeakError::Validation(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };
        serde_json::from_value(arguments).map_err(|e| SpeakError::Validation(e.to_string()))
    }

    pub fn into_request(self) -> SpeakResult<(SynthesisRequest, bool)> {
        let text = self.text.unwrap_or_default();
        let request = SynthesisRequest::new(text, self.speaker_id, self.speed_scale)?;
        Ok((request, self.auto_play))
    }
}

/// Adapter between the tool protocol and the speech pipeline.
#[derive(Clone)]
pub struct SpeakTextTool {
    engine: SpeechEngine,
}

impl SpeakTextTool {
    pub fn new(engine: SpeechEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SpeechEngine {
        &self.engine
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: TOOL_DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to speak"
                    },
                    "speaker_id": {
                        "type": "integer",
                        "description": "Voice/speaker identifier",
                        "minimum": 0,
                        "default": SynthesisRequest::DEFAULT_SPEAKER_ID
                    },
                    "speed_scale": {
                        "type": "number",
                        "description": "Speaking speed multiplier",
                        "default": SynthesisRequest::DEFAULT_SPEED_SCALE
                    },
                    "auto_play": {
                        "type": "boolean",
                        "description": "Play the audio after saving it",
                        "default": true
                    }
                },
                "required": ["text"]
            }),
        }
    }

    /// Run one `speak_text` call and describe what happened.
    pub async fn call(&self, arguments: Value) -> Result<String, ToolCallError> {
        match self.run(arguments).await {
            Ok(message) => Ok(message),
            Err(e) => {
                error!(kind = e.kind(), "speak_text failed: {}", e);
                Err(ToolCallError::from(e))
            }
        }
    }

    async fn run(&self, arguments: Value) -> SpeakResult<String> {
        let (request, auto_play) = SpeakTextArgs::parse(arguments)?.into_request()?;
        let report = self.engine.speak(request, auto_play).await?;
        info!("speak_text done: {}", report.path.display());
        Ok(format_report(&report))
    }
}

/// Status text returned to the caller.
pub fn format_report(report: &SpeakReport) -> String {
    let path = report.path.display();
    let secs = report.duration_secs;
    match &report.playback {
        Some(PlaybackOutcome::Played { .. }) => {
            format!("Generated speech and played it ({:.2}s).\nSaved to: {}", secs, path)
        }
        None => format!("Generated speech and saved it ({:.2}s).\nSaved to: {}", secs, path),
        Some(PlaybackOutcome::Failed { last_error }) => format!(
            "Generated speech and saved it ({:.2}s); playback failed: {}.\nSaved to: {}",
            secs, last_error, path
        ),
    }
}
