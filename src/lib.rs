//! vrm-speak-mcp library
//!
//! Synthesizes speech through a ChatVRM-style HTTP API, stores the WAV and
//! plays it locally. Exposed to agents as the `speak_text` MCP tool.

pub mod backends;
pub mod config_loader;
pub mod engine;
pub mod error;
pub mod playback;
pub mod protocol;
pub mod service;
pub mod storage;
pub mod tool;

#[cfg(test)]
pub(crate) mod test_support;
