//! Local audio playback through whatever player the host OS offers.
//!
//! Each OS family gets an ordered list of player commands. They are tried
//! in order by [`run_fallbacks`] until one exits successfully.

use crate::error::PlaybackError;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wait_timeout::ChildExt;

const STDERR_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOs,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "windows" => HostOs::Windows,
            "macos" | "darwin" => HostOs::MacOs,
            _ => HostOs::Other,
        }
    }
}

/// One way of playing a file: a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub name: &'static str,
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    fn new(name: &'static str, program: &str, args: Vec<String>) -> Self {
        Self {
            name,
            program: program.to_string(),
            args,
        }
    }
}

/// Ordered playback strategies for `os`.
pub fn strategies_for(os: HostOs, path: &Path) -> Vec<PlayerCommand> {
    let file = path.to_string_lossy().to_string();
    match os {
        HostOs::Windows => vec![
            PlayerCommand::new(
                "powershell",
                "powershell",
                vec![
                    "-c".to_string(),
                    format!(
                        "(New-Object Media.SoundPlayer '{}').PlaySync()",
                        file.replace('\'', "''")
                    ),
                ],
            ),
            PlayerCommand::new(
                "wmplayer",
                "cmd",
                vec![
                    "/C".to_string(),
                    "start".to_string(),
                    "/min".to_string(),
                    "wmplayer".to_string(),
                    "/close".to_string(),
                    file.clone(),
                ],
            ),
            PlayerCommand::new(
                "default application",
                "cmd",
                vec![
                    "/C".to_string(),
                    "start".to_string(),
                    String::new(),
                    file,
                ],
            ),
        ],
        HostOs::MacOs => vec![PlayerCommand::new("afplay", "afplay", vec![file])],
        HostOs::Other => vec![
            PlayerCommand::new("aplay", "aplay", vec!["-q".to_string(), file.clone()]),
            PlayerCommand::new("paplay", "paplay", vec![file.clone()]),
            PlayerCommand::new("default application", "xdg-open", vec![file]),
        ],
    }
}

/// Runs a player command to completion.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &PlayerCommand, timeout: Duration) -> Result<(), PlaybackError>;
}

/// Spawns real processes, killing them after the timeout.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &PlayerCommand, timeout: Duration) -> Result<(), PlaybackError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        // Drain stderr while waiting so a chatty player cannot fill the pipe and stall
        let (stderr_tx, stderr_rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let _ = stderr_tx.send(buf);
            });
        }

        let waited = child.wait_timeout(timeout).map_err(|source| {
            let _ = child.kill();
            let _ = child.wait();
            PlaybackError::Spawn {
                program: command.program.clone(),
                source,
            }
        })?;

        match waited {
            Some(status) if status.success() => Ok(()),
            Some(status) => {
                // A forked helper may keep the pipe open; do not wait on it for long
                let stderr = stderr_rx
                    .recv_timeout(STDERR_GRACE)
                    .map(|buf| tail(&buf))
                    .unwrap_or_default();
                Err(PlaybackError::ExitStatus {
                    program: command.program.clone(),
                    status: status.to_string(),
                    stderr,
                })
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(PlaybackError::TimedOut {
                    program: command.program.clone(),
                    secs: timeout.as_secs(),
                })
            }
        }
    }
}

/// End of a player's stderr, enough for an error message.
fn tail(buf: &[u8]) -> String {
    const MAX: usize = 512;
    let text = String::from_utf8_lossy(buf);
    let text = text.trim();
    match text.char_indices().rev().nth(MAX - 1) {
        Some((idx, _)) => text[idx..].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Played { player: &'static str },
    Failed { last_error: String },
}

impl PlaybackOutcome {
    pub fn played(&self) -> bool {
        matches!(self, PlaybackOutcome::Played { .. })
    }
}

/// Try each command in order; stop at the first success.
pub fn run_fallbacks(
    runner: &dyn CommandRunner,
    commands: &[PlayerCommand],
    timeout: Duration,
) -> PlaybackOutcome {
    let mut last_error = String::from("no playback strategy available");

    for command in commands {
        debug!("Trying {} ({} {:?})", command.name, command.program, command.args);
        match runner.run(command, timeout) {
            Ok(()) => return PlaybackOutcome::Played {
                player: command.name,
            },
            Err(e) => {
                debug!("{} failed: {}", command.name, e);
                last_error = e.to_string();
            }
        }
    }

    PlaybackOutcome::Failed { last_error }
}

#[derive(Clone)]
pub struct PlaybackDispatcher {
    runner: Arc<dyn CommandRunner>,
    host: HostOs,
    timeout: Duration,
}

impl std::fmt::Debug for PlaybackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackDispatcher")
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PlaybackDispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, host: HostOs, timeout: Duration) -> Self {
        Self {
            runner,
            host,
            timeout,
        }
    }

    /// Real processes on the current OS.
    pub fn system(timeout: Duration) -> Self {
        Self::new(Arc::new(SystemRunner), HostOs::current(), timeout)
    }

    pub fn host(&self) -> HostOs {
        self.host
    }

    /// Best-effort playback. Failures are logged, never raised.
    pub fn play(&self, path: &Path) -> PlaybackOutcome {
        let commands = strategies_for(self.host, path);
        let outcome = run_fallbacks(self.runner.as_ref(), &commands, self.timeout);
        match &outcome {
            PlaybackOutcome::Played { player } => {
                info!("Audio played using {}: {}", player, path.display());
            }
            PlaybackOutcome::Failed { last_error } => {
                error!("Failed to play audio: {}", last_error);
                warn!("Audio file saved to: {}", path.display());
            }
        }
        outcome
    }
}
