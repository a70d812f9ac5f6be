use crate::backends::chatvrm::ChatVrmBackend;
use crate::backends::{SpeechBackend, SynthesisRequest};
use crate::config_loader::Settings;
use crate::error::SpeakResult;
use crate::playback::{PlaybackDispatcher, PlaybackOutcome};
use crate::storage::AudioStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// What one successful `speak` produced.
#[derive(Debug, Clone)]
pub struct SpeakReport {
    pub path: PathBuf,
    pub duration_secs: f64,
    /// None when playback was not requested
    pub playback: Option<PlaybackOutcome>,
}

/// Synthesize → save → (optionally) play.
#[derive(Clone)]
pub struct SpeechEngine {
    backend: Arc<dyn SpeechBackend>,
    store: AudioStore,
    player: PlaybackDispatcher,
}

impl SpeechEngine {
    pub fn new(backend: Arc<dyn SpeechBackend>, store: AudioStore, player: PlaybackDispatcher) -> Self {
        Self {
            backend,
            store,
            player,
        }
    }

    /// Production wiring: ChatVRM over HTTP, system players.
    pub fn from_settings(settings: &Settings) -> SpeakResult<Self> {
        let backend = ChatVrmBackend::from_settings(settings)?;
        Ok(Self::new(
            Arc::new(backend),
            AudioStore::new(settings.output_directory()),
            PlaybackDispatcher::system(settings.playback_timeout()),
        ))
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    pub fn player(&self) -> &PlaybackDispatcher {
        &self.player
    }

    pub async fn speak(&self, request: SynthesisRequest, auto_play: bool) -> SpeakResult<SpeakReport> {
        info!(
            backend = self.backend.id(),
            auto_play, "Speaking {} chars", request.text.chars().count()
        );

        let audio = self.backend.synthesize(&request).await?;
        let path = self.store.save(&audio.bytes)?;
        info!("Audio length: {:.2}s", audio.duration_secs);

        let playback = if auto_play {
            Some(self.play(path.clone()).await?)
        } else {
            None
        };

        Ok(SpeakReport {
            path,
            duration_secs: audio.duration_secs,
            playback,
        })
    }

    /// Play on the blocking pool; the player process can run for a while.
    pub async fn play(&self, path: PathBuf) -> SpeakResult<PlaybackOutcome> {
        let player = self.player.clone();
        match tokio::task::spawn_blocking(move || player.play(&path)).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Playback task failed: {}", e);
                Ok(PlaybackOutcome::Failed {
                    last_error: format!("playback task failed: {}", e),
                })
            }
        }
    }

    /// Create the output directory up front so misconfiguration shows at startup.
    pub fn prepare_output_dir(&self) -> SpeakResult<()> {
        self.store.ensure_dir().map_err(|e| {
            error!("Output directory {} unusable: {}", self.store.dir().display(), e);
            e
        })
    }
}
