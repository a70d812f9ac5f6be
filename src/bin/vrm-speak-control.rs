//! vrm-speak-control - CLI for the vrm-speak pipeline
//!
//! Runs the same synthesize/save/play pipeline the MCP server uses, without
//! an MCP client in front of it.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use vrm_speak_mcp::config_loader::{Overrides, Settings};
use vrm_speak_mcp::engine::SpeechEngine;
use vrm_speak_mcp::playback::PlaybackOutcome;
use vrm_speak_mcp::tool::SpeakTextTool;

/// CLI control utility for vrm-speak-mcp
#[derive(Parser)]
#[command(name = "vrm-speak-control")]
#[command(author = "StarTuz")]
#[command(version)]
#[command(about = "Generate and play VRM character speech from the command line", long_about = None)]
struct Cli {
    /// Speech API endpoint (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Output directory (overrides config)
    #[arg(long, global = true)]
    output_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize text, save it and play it
    Speak {
        /// Text to speak
        text: String,
        /// Speaker id
        #[arg(short, long, default_value = "1")]
        speaker: u32,
        /// Speed multiplier
        #[arg(long, default_value = "1.0")]
        speed: f64,
        /// Save only, do not play
        #[arg(long)]
        no_play: bool,
    },

    /// Play an existing WAV file
    Play {
        /// Path to the audio file
        path: PathBuf,
    },

    /// Print the speak_text tool definition
    Schema,

    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(&Overrides {
        api_url: cli.api_url,
        output_dir: cli.output_dir,
        ..Default::default()
    })?;

    match cli.command {
        Commands::Speak {
            text,
            speaker,
            speed,
            no_play,
        } => {
            let tool = SpeakTextTool::new(SpeechEngine::from_settings(&settings)?);
            let message = tool
                .call(json!({
                    "text": text,
                    "speaker_id": speaker,
                    "speed_scale": speed,
                    "auto_play": !no_play,
                }))
                .await?;
            println!("{}", message);
        }

        Commands::Play { path } => {
            if !path.is_file() {
                eprintln!("No such file: {}", path.display());
                std::process::exit(1);
            }
            let engine = SpeechEngine::from_settings(&settings)?;
            match engine.play(path.clone()).await? {
                PlaybackOutcome::Played { player } => {
                    println!("Played {} with {}", path.display(), player)
                }
                PlaybackOutcome::Failed { last_error } => {
                    eprintln!("Playback failed: {}", last_error);
                    std::process::exit(1);
                }
            }
        }

        Commands::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&SpeakTextTool::definition())?
            );
        }

        Commands::Config => {
            println!("api_url:          {}", settings.api_url);
            println!("audio_field:      {}", settings.audio_field);
            println!("output_dir:       {}", settings.output_directory().display());
            println!("http_timeout:     {}s", settings.http_timeout_secs);
            println!("playback_timeout: {}s", settings.playback_timeout_secs);
            println!("log_level:        {}", settings.log_level);
        }
    }

    Ok(())
}
