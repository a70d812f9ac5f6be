//! Error types for the speak pipeline.
//!
//! `SpeakError` covers everything that can fail a `speak_text` call.
//! Playback problems live in [`PlaybackError`] and never leave the
//! dispatcher.

use thiserror::Error;

/// Failure of one `speak_text` invocation.
#[derive(Error, Debug)]
pub enum SpeakError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("remote service error{}: {message}", status_suffix(.status))]
    RemoteService {
        status: Option<u16>,
        message: String,
    },

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    #[error("audio decode error: {0}")]
    AudioDecode(String),

    #[error("storage error: {0}")]
    Storage(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl SpeakError {
    /// Short machine-friendly name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SpeakError::Validation(_) => "validation",
            SpeakError::RemoteService { .. } => "remote_service",
            SpeakError::ResponseFormat(_) => "response_format",
            SpeakError::AudioDecode(_) => "audio_decode",
            SpeakError::Storage(_) => "storage",
        }
    }
}

impl From<reqwest::Error> for SpeakError {
    fn from(err: reqwest::Error) -> Self {
        SpeakError::RemoteService {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<hound::Error> for SpeakError {
    fn from(err: hound::Error) -> Self {
        SpeakError::AudioDecode(err.to_string())
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Result type alias for pipeline operations
pub type SpeakResult<T> = Result<T, SpeakError>;

/// The single error shape handed back to the tool protocol.
#[derive(Error, Debug)]
#[error("Error processing speak_text request: {source}")]
pub struct ToolCallError {
    pub source: SpeakError,
}

impl From<SpeakError> for ToolCallError {
    fn from(source: SpeakError) -> Self {
        Self { source }
    }
}

/// Why a single playback strategy did not succeed.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}{}", stderr_suffix(.stderr))]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },
}
