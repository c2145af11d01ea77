use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

/// Binaries the composition engine shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

pub async fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_duration(stdout: &str) -> Result<f64> {
    let duration: f64 = stdout
        .trim()
        .parse()
        .context("Failed to parse ffprobe duration as f64")?;

    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!("ffprobe reported an unusable duration: {}", stdout.trim());
    }

    Ok(duration)
}

/// Names of required tools that are not on PATH.
pub fn missing_tools() -> Vec<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .copied()
        .filter(|tool| which::which(tool).is_err())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reported_duration() {
        assert!((parse_probe_duration("25.032000\n").unwrap() - 25.032).abs() < 1e-9);
    }

    #[test]
    fn rejects_unusable_durations() {
        assert!(parse_probe_duration("N/A").is_err());
        assert!(parse_probe_duration("0.000000").is_err());
        assert!(parse_probe_duration("").is_err());
    }
}
