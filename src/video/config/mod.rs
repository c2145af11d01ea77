use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Import macro from crate root (#[macro_export] places it there)
use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;
use crate::video::visuals::{AssetDestination, ProducerSettings};

/// Environment variable consulted when `script_api_key` is unset.
pub const SCRIPT_API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Directory finished videos are written to
    pub output_dir: PathBuf,
    /// Directory for narration, stills and the intermediate base video
    pub temp_dir: PathBuf,
    /// Still frames generated per scene
    pub frames_per_scene: usize,
    /// Image requests in flight at once (1 = sequential)
    pub image_concurrency: usize,
    /// Pause between sequential image requests, in milliseconds
    pub image_delay_ms: u64,
    pub image_timeout_secs: u64,
    pub tts_timeout_secs: u64,
    pub script_timeout_secs: u64,
    /// Upper bound for a single ffmpeg pass
    pub ffmpeg_timeout_secs: u64,
    /// Compositions allowed to run at the same time across all jobs
    pub max_concurrent_compositions: usize,
    /// Narration language hint (e.g. "hinglish", "en", "hi")
    pub language: String,
    pub script_model: String,
    pub script_endpoint: String,
    /// Font file for captions; fontconfig's "Sans" when unset
    pub caption_font: Option<PathBuf>,
    pub script_api_key: Option<String>,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            output_dir: paths::default_output_dir(),
            temp_dir: paths::default_temp_dir(),
            frames_per_scene: Self::DEFAULT_FRAMES_PER_SCENE,
            image_concurrency: 1,
            image_delay_ms: Self::DEFAULT_IMAGE_DELAY_MS,
            image_timeout_secs: Self::DEFAULT_IMAGE_TIMEOUT_SECS,
            tts_timeout_secs: Self::DEFAULT_TTS_TIMEOUT_SECS,
            script_timeout_secs: Self::DEFAULT_SCRIPT_TIMEOUT_SECS,
            ffmpeg_timeout_secs: Self::DEFAULT_FFMPEG_TIMEOUT_SECS,
            max_concurrent_compositions: Self::DEFAULT_MAX_COMPOSITIONS,
            language: Self::DEFAULT_LANGUAGE.to_string(),
            script_model: "llama-3.3-70b-versatile".to_string(),
            script_endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            caption_font: None,
            script_api_key: None,
        }
    }
}

impl ReelConfig {
    pub const DEFAULT_FRAMES_PER_SCENE: usize = 1;
    pub const MAX_FRAMES_PER_SCENE: usize = 8;
    pub const DEFAULT_IMAGE_DELAY_MS: u64 = 1500;
    pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_TTS_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 600;
    pub const DEFAULT_MAX_COMPOSITIONS: usize = 2;
    pub const DEFAULT_LANGUAGE: &'static str = "hinglish";

    pub fn load() -> Result<Self> {
        let path = <Self as DocumentedConfig>::config_path()?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = <Self as DocumentedConfig>::load_from_path_documented(path)?;
        config.sanitize();
        if config.script_api_key.is_none() {
            config.script_api_key = std::env::var(SCRIPT_API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        Ok(config)
    }

    /// Replace out-of-range values with their defaults.
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.frames_per_scene == 0 {
            self.frames_per_scene = defaults.frames_per_scene;
        }
        self.frames_per_scene = self.frames_per_scene.min(Self::MAX_FRAMES_PER_SCENE);
        if self.image_concurrency == 0 {
            self.image_concurrency = defaults.image_concurrency;
        }
        if self.image_timeout_secs == 0 {
            self.image_timeout_secs = defaults.image_timeout_secs;
        }
        if self.tts_timeout_secs == 0 {
            self.tts_timeout_secs = defaults.tts_timeout_secs;
        }
        if self.script_timeout_secs == 0 {
            self.script_timeout_secs = defaults.script_timeout_secs;
        }
        if self.ffmpeg_timeout_secs == 0 {
            self.ffmpeg_timeout_secs = defaults.ffmpeg_timeout_secs;
        }
        if self.max_concurrent_compositions == 0 {
            self.max_concurrent_compositions = defaults.max_concurrent_compositions;
        }
        if self.language.trim().is_empty() {
            self.language = defaults.language;
        }
        if self.caption_font.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            self.caption_font = None;
        }
    }

    pub fn producer_settings(&self) -> ProducerSettings {
        ProducerSettings {
            frames_per_scene: self.frames_per_scene,
            concurrency: self.image_concurrency,
            delay: Duration::from_millis(self.image_delay_ms),
            ..ProducerSettings::default()
        }
    }

    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(self.output_dir.clone(), self.temp_dir.clone())
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }

    pub fn ffmpeg_timeout(&self) -> Duration {
        Duration::from_secs(self.ffmpeg_timeout_secs)
    }
}

documented_config!(ReelConfig {
    fields: [
        output_dir, "Directory finished videos are written to",
        temp_dir, "Directory for intermediate narration, stills and base video",
        frames_per_scene, "Still frames generated per scene (1-8)",
        image_concurrency, "Image requests in flight at once (1 = sequential)",
        image_delay_ms, "Pause between sequential image requests in milliseconds",
        image_timeout_secs, "Timeout for one image request in seconds",
        tts_timeout_secs, "Timeout for one speech request in seconds",
        script_timeout_secs, "Timeout for the script request in seconds",
        ffmpeg_timeout_secs, "Timeout for one ffmpeg pass in seconds",
        max_concurrent_compositions, "Compositions allowed to run at the same time",
        language, "Narration language (hinglish, en, hi, ...)",
        script_model, "Chat model used to write scripts",
        script_endpoint, "OpenAI-compatible chat completions endpoint",
    ],
    optional: [
        caption_font, "Font file used for captions (fontconfig Sans when unset)",
        script_api_key, "API key for the script endpoint (falls back to GROQ_API_KEY)",
    ],
    config_path: Ok(paths::reel_config_dir()?.join("reel.toml")),
});

/// Where a job's intermediate and final files live.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    output_dir: PathBuf,
    temp_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(output_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            output_dir,
            temp_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.temp_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(format!("{job_id}.mp4"))
    }

    pub fn audio_path(&self, job_id: &str) -> PathBuf {
        self.temp_dir.join(format!("{job_id}_audio.mp3"))
    }

    pub fn base_video_path(&self, job_id: &str) -> PathBuf {
        self.temp_dir.join(format!("{job_id}_base.mp4"))
    }

    /// Existing temp files belonging to `job_id`.
    pub fn intermediates(&self, job_id: &str) -> Result<Vec<PathBuf>> {
        let prefix = format!("{job_id}_");
        let entries = match fs::read_dir(&self.temp_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read directory {}", self.temp_dir.display())
                });
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("Failed to read directory {}", self.temp_dir.display())
            })?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn asset_destination(&self, job_id: &str) -> AssetDestination {
        AssetDestination {
            dir: self.temp_dir.clone(),
            prefix: job_id.to_string(),
        }
    }
}
