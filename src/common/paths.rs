use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for reelforge

/// Get the main reelforge config directory
pub fn reel_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("reelforge");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

fn reel_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("reelforge")
}

/// Default location for finished videos
pub fn default_output_dir() -> PathBuf {
    reel_data_dir().join("output")
}

/// Default location for intermediate artifacts (audio, frames, base video)
pub fn default_temp_dir() -> PathBuf {
    reel_data_dir().join("temp")
}
