//! vrm-speak-mcp - `speak_text` MCP server on stdio.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vrm_speak_mcp::config_loader::{Overrides, Settings};
use vrm_speak_mcp::engine::SpeechEngine;
use vrm_speak_mcp::service::SpeechService;
use vrm_speak_mcp::tool::SpeakTextTool;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Speech API endpoint (POST)
    #[arg(long)]
    api_url: Option<String>,

    /// Where generated WAV files are saved
    #[arg(long)]
    output_dir: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    http_timeout: Option<u64>,

    /// Playback timeout in seconds
    #[arg(long)]
    playback_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let verbose = args.verbose;
    let settings = Settings::load(&Overrides {
        api_url: args.api_url,
        output_dir: args.output_dir,
        http_timeout_secs: args.http_timeout,
        playback_timeout_secs: args.playback_timeout,
        log_level: verbose.then(|| "debug".to_string()),
    })?;

    // stdout carries the protocol; logs go to stderr
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("vrm-speak-mcp v{} starting", env!("CARGO_PKG_VERSION"));
    info!("API endpoint: {}", settings.api_url);
    info!("Output directory: {}", settings.output_directory().display());

    let engine = SpeechEngine::from_settings(&settings)?;
    if let Err(e) = engine.prepare_output_dir() {
        // Every call will report this again; keep serving
        warn!("{}", e);
    }

    let service = SpeechService::new(SpeakTextTool::new(engine));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    service.serve(stdin, tokio::io::stdout()).await?;

    Ok(())
}
