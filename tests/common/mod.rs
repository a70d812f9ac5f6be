//! Shared helpers for integration tests.
#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vrm_speak_mcp::backends::chatvrm::ChatVrmBackend;
use vrm_speak_mcp::engine::SpeechEngine;
use vrm_speak_mcp::error::PlaybackError;
use vrm_speak_mcp::playback::{CommandRunner, HostOs, PlaybackDispatcher, PlayerCommand};
use vrm_speak_mcp::storage::AudioStore;
use vrm_speak_mcp::tool::SpeakTextTool;

pub const API_PATH: &str = "/api/speak_text";

/// Command runner that records every player it is asked to launch.
#[derive(Debug, Clone)]
pub struct RecordingRunner {
    pub launched: Arc<Mutex<Vec<String>>>,
    /// Programs that "fail" when run
    failing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            launched: Arc::new(Mutex::new(Vec::new())),
            failing: Vec::new(),
        }
    }

    pub fn failing(programs: &[&str]) -> Self {
        Self {
            launched: Arc::new(Mutex::new(Vec::new())),
            failing: programs.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &PlayerCommand, _timeout: Duration) -> Result<(), PlaybackError> {
        self.launched.lock().unwrap().push(command.program.clone());
        if self.failing.contains(&command.program) {
            return Err(PlaybackError::ExitStatus {
                program: command.program.clone(),
                status: "exit status: 1".to_string(),
                stderr: "no audio device".to_string(),
            });
        }
        Ok(())
    }
}

/// A mono 16-bit WAV of `frames` silent samples.
pub fn silent_wav(sample_rate: u32, frames: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// JSON body the speech API answers with.
pub fn audio_body(wav: &[u8]) -> String {
    json!({
        "audio": format!("data:audio/wav;base64,{}", general_purpose::STANDARD.encode(wav))
    })
    .to_string()
}

pub fn engine(server_url: &str, out: &Path, runner: RecordingRunner) -> SpeechEngine {
    let backend = ChatVrmBackend::new(
        &format!("{}{}", server_url, API_PATH),
        "audio",
        Duration::from_secs(5),
    )
    .unwrap();
    SpeechEngine::new(
        Arc::new(backend),
        AudioStore::new(out),
        PlaybackDispatcher::new(Arc::new(runner), HostOs::Other, Duration::from_secs(5)),
    )
}

pub fn tool(server_url: &str, out: &Path, runner: RecordingRunner) -> SpeakTextTool {
    SpeakTextTool::new(engine(server_url, out, runner))
}

pub fn wav_files(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|x| x == "wav").unwrap_or(false))
            .collect(),
        Err(_) => Vec::new(),
    }
}
