//! ChatVRM `speak_text` HTTP backend.
//!
//! The API answers `{"audio": "data:audio/wav;base64,..."}`.

use super::{SpeechBackend, SynthesisRequest, SynthesizedAudio};
use crate::config_loader::Settings;
use crate::error::{SpeakError, SpeakResult};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, error, info, warn};

lazy_static! {
    static ref WAV_DATA_URI: Regex = Regex::new(r"(?s)^data:audio/wav;base64,(.*)").unwrap();
}

pub struct ChatVrmBackend {
    client: Client,
    api_url: String,
    audio_field: String,
}

impl ChatVrmBackend {
    pub fn new(api_url: &str, audio_field: &str, timeout: Duration) -> SpeakResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            audio_field: audio_field.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> SpeakResult<Self> {
        Self::new(
            &settings.api_url,
            &settings.audio_field,
            settings.http_timeout(),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Pull the data URI out of the response body and base64-decode it.
    fn extract_audio(&self, body: &Value) -> SpeakResult<Vec<u8>> {
        let obj = body
            .as_object()
            .ok_or_else(|| SpeakError::ResponseFormat("response is not a JSON object".into()))?;
        debug!("Response keys: {:?}", obj.keys().collect::<Vec<_>>());

        let uri = match obj.get(&self.audio_field) {
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(SpeakError::ResponseFormat(format!(
                    "'{}' field is not a string",
                    self.audio_field
                )))
            }
            None => {
                warn!("'{}' field missing from response", self.audio_field);
                return Err(SpeakError::ResponseFormat(format!(
                    "'{}' field missing from response",
                    self.audio_field
                )));
            }
        };

        decode_wav_data_uri(uri)
    }
}

/// Decode `data:audio/wav;base64,<payload>` into raw bytes.
pub fn decode_wav_data_uri(uri: &str) -> SpeakResult<Vec<u8>> {
    let payload = WAV_DATA_URI
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            error!("audio field has an unexpected format");
            SpeakError::ResponseFormat("audio field is not a data:audio/wav;base64 URI".into())
        })?;

    // Line-wrapped base64 is still one payload
    let payload: String = payload
        .as_str()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| SpeakError::ResponseFormat(format!("invalid base64 audio payload: {}", e)))
}

/// Read the WAV header and compute the clip duration.
pub fn inspect_wav(bytes: Vec<u8>) -> SpeakResult<SynthesizedAudio> {
    let reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(SpeakError::AudioDecode("sample rate is zero".into()));
    }
    let frames = reader.duration();
    let duration_secs = frames as f64 / spec.sample_rate as f64;
    drop(reader);

    Ok(SynthesizedAudio {
        bytes,
        duration_secs,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

#[async_trait]
impl SpeechBackend for ChatVrmBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> SpeakResult<SynthesizedAudio> {
        request.validate()?;

        info!(
            speaker_id = request.speaker_id,
            speed_scale = request.speed_scale,
            "Sending speak_text request to {}",
            self.api_url
        );

        let resp = self.client.post(&self.api_url).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("speak_text API error {}: {}", status, body);
            return Err(SpeakError::RemoteService {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| SpeakError::ResponseFormat(format!("response is not JSON: {}", e)))?;

        let bytes = self.extract_audio(&json)?;
        let audio = inspect_wav(bytes)?;

        info!(
            "Received {} bytes of WAV audio ({:.2}s, {} Hz, {} ch)",
            audio.bytes.len(),
            audio.duration_secs,
            audio.sample_rate,
            audio.channels
        );
        Ok(audio)
    }

    fn id(&self) -> &'static str {
        "chatvrm"
    }
}
