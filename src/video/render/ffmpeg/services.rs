use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::ui::prelude::{Level, emit};
use crate::video::support::ffmpeg::probe_duration_seconds;

/// Executes one ffmpeg invocation described by a compiled argument vector.
#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

/// Reads the duration of a media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn duration(&self, path: &Path) -> Result<f64>;
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    /// Expected output length, used to turn `time=` lines into percentages
    pub total_duration: Option<f64>,
    /// Echo raw ffmpeg stderr
    pub verbose: bool,
    pub timeout: Option<Duration>,
    /// Short name of the pass for log events ("base", "captions", ...)
    pub label: &'static str,
}

impl FfmpegRunOptions {
    pub fn new(label: &'static str, total_duration: Option<f64>, timeout: Option<Duration>) -> Self {
        Self {
            total_duration,
            verbose: crate::ui::is_debug_enabled(),
            timeout,
            label,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemFfmpegRunner {
    binary: PathBuf,
}

impl SystemFfmpegRunner {
    pub fn locate() -> Result<Self> {
        let binary = which::which("ffmpeg").context("ffmpeg not found in PATH")?;
        Ok(Self { binary })
    }
}

#[async_trait]
impl FfmpegRunner for SystemFfmpegRunner {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let Some(stderr) = child.stderr.take() else {
            bail!("ffmpeg stderr was not captured");
        };

        let work = async {
            let mut tracker = StderrTracker::new(&options);
            let read = tracker.consume(stderr).await;
            let status = child.wait().await.context("Failed to wait for ffmpeg")?;
            read?;
            Ok::<_, anyhow::Error>((status, tracker))
        };

        let (status, tracker) = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result?,
                Err(_) => bail!(
                    "ffmpeg {} pass timed out after {}s",
                    options.label,
                    limit.as_secs()
                ),
            },
            None => work.await?,
        };

        if !status.success() {
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                tracker.error_summary()
            );
        }

        Ok(())
    }
}

/// Accumulates ffmpeg stderr, keeping error lines and reporting progress.
struct StderrTracker<'a> {
    options: &'a FfmpegRunOptions,
    last_line: String,
    error_lines: Vec<String>,
    next_report_pct: u32,
}

impl<'a> StderrTracker<'a> {
    fn new(options: &'a FfmpegRunOptions) -> Self {
        Self {
            options,
            last_line: String::new(),
            error_lines: Vec::new(),
            next_report_pct: 10,
        }
    }

    async fn consume<R: AsyncRead + Unpin>(&mut self, mut stderr: R) -> Result<()> {
        let mut buffer = [0u8; 4096];
        let mut accumulated = String::new();

        loop {
            let bytes_read = stderr
                .read(&mut buffer)
                .await
                .context("Failed to read ffmpeg stderr")?;
            if bytes_read == 0 {
                break;
            }

            accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

            while let Some(pos) = accumulated.find(['\r', '\n']) {
                let line = accumulated[..pos].to_string();
                accumulated.drain(..=pos);
                if !line.is_empty() {
                    self.observe(line);
                }
            }
        }

        if !accumulated.is_empty() {
            self.observe(accumulated);
        }
        Ok(())
    }

    fn observe(&mut self, line: String) {
        if self.options.verbose {
            eprintln!("{}", line);
        }

        if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
            self.error_lines.push(line.clone());
        }

        if let (Some(total), Some(position)) =
            (self.options.total_duration, parse_ffmpeg_progress(&line))
            && total > 0.0
        {
            let pct = ((position / total) * 100.0).clamp(0.0, 100.0) as u32;
            if pct >= self.next_report_pct {
                emit(
                    Level::Debug,
                    "reel.ffmpeg.progress",
                    &format!(
                        "{} pass {}%{}",
                        self.options.label,
                        pct,
                        parse_ffmpeg_speed(&line)
                            .map(|s| format!(" ({s})"))
                            .unwrap_or_default()
                    ),
                    None,
                );
                self.next_report_pct = (pct / 10 + 1) * 10;
            }
        }

        self.last_line = line;
    }

    fn error_summary(&self) -> String {
        let msg = if self.error_lines.is_empty() {
            self.last_line.clone()
        } else {
            self.error_lines.join("\n")
        };
        msg.trim().to_string()
    }
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ')?;
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..=speed_end].to_string())
}

/// Prober that shells out to `ffprobe`.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber {
    timeout: Option<Duration>,
}

impl FfprobeProber {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn duration(&self, path: &Path) -> Result<f64> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, probe_duration_seconds(path))
                .await
                .with_context(|| format!("ffprobe timed out for {}", path.display()))?,
            None => probe_duration_seconds(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_time() {
        let line = "frame=  240 fps= 60 q=28.0 size=    512kB time=00:01:02.50 bitrate= 419.4kbits/s speed=2.01x";
        assert_eq!(parse_ffmpeg_progress(line), Some(62.5));
        assert_eq!(parse_ffmpeg_speed(line).as_deref(), Some("2.01x"));
    }

    #[test]
    fn ignores_lines_without_time() {
        assert_eq!(parse_ffmpeg_progress("Input #0, mp3, from 'a.mp3':"), None);
        assert_eq!(parse_time_to_seconds("12.5"), None);
    }

    #[tokio::test]
    async fn tracker_collects_error_lines() {
        let options = FfmpegRunOptions::new("captions", Some(10.0), None);
        let mut tracker = StderrTracker::new(&options);
        let input: &[u8] = b"ffmpeg version 7\r\n[Parsed_drawtext_0] Error initializing filter\nlast line";
        tracker.consume(input).await.unwrap();
        assert_eq!(tracker.error_lines.len(), 1);
        assert!(tracker.error_summary().contains("drawtext"));
        assert_eq!(tracker.last_line, "last line");
    }
}
