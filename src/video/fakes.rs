//! In-process stand-ins for the external services, shared by unit tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::video::narration::{AudioTrack, NarrationSynthesizer, SynthesisError};
use crate::video::render::ffmpeg::services::{FfmpegRunOptions, FfmpegRunner, MediaProber};
use crate::video::script::{Scene, Script, ScriptWriter};
use crate::video::visuals::{ImageError, ImageGenerator};

type FailurePredicate = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// Records every invocation and writes a stub file at the output path.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Vec<String>>>,
    durations: Mutex<Vec<Option<f64>>>,
    fail_when: Option<FailurePredicate>,
}

impl ScriptedRunner {
    pub fn failing_when(predicate: impl Fn(&[String]) -> bool + Send + Sync + 'static) -> Self {
        Self {
            fail_when: Some(Box::new(predicate)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn durations(&self) -> Vec<Option<f64>> {
        self.durations.lock().unwrap().clone()
    }
}

#[async_trait]
impl FfmpegRunner for ScriptedRunner {
    async fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        self.calls.lock().unwrap().push(args.to_vec());
        self.durations.lock().unwrap().push(options.total_duration);

        if self.fail_when.as_ref().is_some_and(|fail| fail(args)) {
            bail!("simulated ffmpeg failure in {} pass", options.label);
        }

        let output = args.last().ok_or_else(|| anyhow!("no output argument"))?;
        std::fs::write(output, b"video")?;
        Ok(())
    }
}

pub struct FixedProber {
    duration: Option<f64>,
}

impl FixedProber {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration),
        }
    }

    pub fn failing() -> Self {
        Self { duration: None }
    }
}

#[async_trait]
impl MediaProber for FixedProber {
    async fn duration(&self, path: &Path) -> Result<f64> {
        self.duration
            .ok_or_else(|| anyhow!("cannot probe {}", path.display()))
    }
}

pub struct StaticScriptWriter {
    script: Script,
}

impl StaticScriptWriter {
    pub fn with_scenes(count: usize) -> Self {
        let scenes: Vec<Scene> = (0..count)
            .map(|i| Scene {
                narration: format!("Scene number {i} is here"),
                visual: format!("visual {i}"),
                duration: 5.0,
                words: Vec::new(),
            })
            .collect();
        let full_text = if scenes.is_empty() {
            "Just a hook".to_string()
        } else {
            scenes
                .iter()
                .map(|s| s.narration.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };
        Self {
            script: Script {
                hook: "Hook".to_string(),
                full_text,
                scenes,
            },
        }
    }
}

#[async_trait]
impl ScriptWriter for StaticScriptWriter {
    async fn write(&self, _prompt: &str, _duration_secs: f64) -> Result<Script> {
        Ok(self.script.clone())
    }
}

pub struct FakeNarrator {
    fail: bool,
    gate: Option<Arc<Notify>>,
}

impl FakeNarrator {
    pub fn ok() -> Self {
        Self {
            fail: false,
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            gate: None,
        }
    }

    /// Blocks until the returned gate is notified.
    pub fn gated() -> Self {
        Self {
            fail: false,
            gate: Some(Arc::new(Notify::new())),
        }
    }

    pub fn gate(&self) -> Arc<Notify> {
        self.gate.clone().unwrap_or_else(|| Arc::new(Notify::new()))
    }
}

#[async_trait]
impl NarrationSynthesizer for FakeNarrator {
    async fn synthesize(
        &self,
        _text: &str,
        _language_hint: &str,
        output: &Path,
    ) -> Result<AudioTrack, SynthesisError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(SynthesisError::SynthesisFailure(
                "voice service unreachable".to_string(),
            ));
        }
        std::fs::write(output, b"mp3")
            .map_err(|err| SynthesisError::SynthesisFailure(err.to_string()))?;
        Ok(AudioTrack {
            path: output.to_path_buf(),
            duration: 25.0,
        })
    }
}

pub struct FailingImages;

#[async_trait]
impl ImageGenerator for FailingImages {
    async fn generate(
        &self,
        _prompt: &str,
        _width: u32,
        _height: u32,
        _seed: u64,
    ) -> Result<Bytes, ImageError> {
        Err(ImageError::Status(429))
    }
}
