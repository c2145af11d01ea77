//! Per-scene still images: external generation with a local fallback.

pub mod normalize;
pub mod placeholder;
pub mod pollinations;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;
use image::DynamicImage;
use thiserror::Error;

use crate::ui::prelude::{Level, emit};
use crate::video::render::program::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::video::script::Scene;

pub use pollinations::PollinationsGenerator;

/// Appended to every scene description sent to the generator.
pub const STYLE_SUFFIX: &str = ", 3D cartoon character, pixar style, disney quality, expressive animated character, colorful, professional animation, high detail, vibrant colors, studio lighting, animated movie frame";

/// Movement cues cycled across the frames of a scene.
pub const MOVEMENT_CUES: [&str; 8] = [
    "character looking forward",
    "character slight smile",
    "character nodding",
    "character gesturing",
    "character excited expression",
    "character talking",
    "character pointing",
    "character happy pose",
];

/// One normalized still ready for composition.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAsset {
    pub path: PathBuf,
    pub scene_index: usize,
    pub frame_index: usize,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image request failed: {0}")]
    Request(String),
    #[error("image service returned HTTP {0}")]
    Status(u16),
    #[error("image service returned an empty body")]
    Empty,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        seed: u64,
    ) -> Result<Bytes, ImageError>;
}

#[derive(Debug, Clone)]
pub struct ProducerSettings {
    pub frames_per_scene: usize,
    /// 1 means strictly sequential with `delay` between calls
    pub concurrency: usize,
    pub delay: Duration,
    pub width: u32,
    pub height: u32,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            frames_per_scene: 1,
            concurrency: 1,
            delay: Duration::from_millis(1500),
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }
}

/// Where produced stills are written: `{dir}/{prefix}_scene{S}_frame{F}.jpg`.
#[derive(Debug, Clone)]
pub struct AssetDestination {
    pub dir: PathBuf,
    pub prefix: String,
}

impl AssetDestination {
    pub fn path_for(&self, scene_index: usize, frame_index: usize) -> PathBuf {
        self.dir.join(format!(
            "{}_scene{}_frame{}.jpg",
            self.prefix, scene_index, frame_index
        ))
    }
}

pub fn frame_prompt(visual: &str, frame_index: usize, frames_per_scene: usize) -> String {
    if frames_per_scene <= 1 {
        format!("{visual}{STYLE_SUFFIX}")
    } else {
        let cue = MOVEMENT_CUES[frame_index % MOVEMENT_CUES.len()];
        format!("{visual}, {cue}{STYLE_SUFFIX}")
    }
}

pub fn frame_seed(scene_index: usize, frame_index: usize) -> u64 {
    (scene_index * 100 + frame_index) as u64
}

type FrameFuture<'a> = Pin<Box<dyn Future<Output = Option<VisualAsset>> + Send + 'a>>;

pub struct VisualProducer {
    generator: Arc<dyn ImageGenerator>,
    settings: ProducerSettings,
}

impl VisualProducer {
    pub fn new(generator: Arc<dyn ImageGenerator>, settings: ProducerSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Produce every frame of one scene, in frame order.
    pub async fn produce(
        &self,
        scene: &Scene,
        scene_index: usize,
        dest: &AssetDestination,
    ) -> Vec<VisualAsset> {
        let mut assets = Vec::new();
        for frame_index in 0..self.settings.frames_per_scene.max(1) {
            if frame_index > 0 {
                tokio::time::sleep(self.settings.delay).await;
            }
            if let Some(asset) = self.produce_frame(scene, scene_index, frame_index, dest).await {
                assets.push(asset);
            }
        }
        assets
    }

    /// Produce all scenes, returning assets ordered by (scene, frame).
    pub async fn produce_all(&self, scenes: &[Scene], dest: &AssetDestination) -> Vec<VisualAsset> {
        if self.settings.concurrency <= 1 {
            let mut assets = Vec::new();
            for (scene_index, scene) in scenes.iter().enumerate() {
                if scene_index > 0 {
                    tokio::time::sleep(self.settings.delay).await;
                }
                assets.extend(self.produce(scene, scene_index, dest).await);
            }
            return assets;
        }

        // Futures are built up front so the stream owns them outright.
        let frames = self.settings.frames_per_scene.max(1);
        let mut pending: Vec<FrameFuture<'_>> = Vec::with_capacity(scenes.len() * frames);
        for (scene_index, scene) in scenes.iter().enumerate() {
            for frame_index in 0..frames {
                pending.push(Box::pin(
                    self.produce_frame(scene, scene_index, frame_index, dest),
                ));
            }
        }

        stream::iter(pending)
            .buffered(self.settings.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn produce_frame(
        &self,
        scene: &Scene,
        scene_index: usize,
        frame_index: usize,
        dest: &AssetDestination,
    ) -> Option<VisualAsset> {
        let path = dest.path_for(scene_index, frame_index);
        let (width, height) = (self.settings.width, self.settings.height);
        let prompt = frame_prompt(&scene.visual, frame_index, self.settings.frames_per_scene);

        let generated = match self
            .generator
            .generate(&prompt, width, height, frame_seed(scene_index, frame_index))
            .await
        {
            Ok(bytes) => {
                let target = path.clone();
                run_blocking(move || {
                    normalize::write_normalized_bytes(&bytes, width, height, &target)
                })
                .await
            }
            Err(err) => Err(err.into()),
        };

        if let Err(err) = generated {
            emit(
                Level::Warn,
                "reel.visuals.placeholder",
                &format!(
                    "Scene {scene_index} frame {frame_index}: generation failed ({err:#}); using placeholder"
                ),
                None,
            );
            let shift = frame_index as f32 / self.settings.frames_per_scene.max(1) as f32;
            let target = path.clone();
            let written = run_blocking(move || {
                let frame = DynamicImage::ImageRgb8(placeholder::render(
                    scene_index,
                    shift,
                    width,
                    height,
                ));
                normalize::write_normalized(&frame, width, height, &target)
            })
            .await;

            if let Err(err) = written {
                emit(
                    Level::Error,
                    "reel.visuals.write_failed",
                    &format!("Scene {scene_index} frame {frame_index} dropped: {err:#}"),
                    None,
                );
                return None;
            }
        }

        Some(VisualAsset {
            path,
            scene_index,
            frame_index,
        })
    }
}

async fn run_blocking<F>(work: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Image worker panicked")?
}

/// Render and write one fallback frame without going through a generator.
pub fn write_placeholder(
    scene_index: usize,
    frame_index: usize,
    frames_per_scene: usize,
    path: &Path,
) -> Result<()> {
    let shift = frame_index as f32 / frames_per_scene.max(1) as f32;
    let frame = DynamicImage::ImageRgb8(placeholder::render(
        scene_index,
        shift,
        FRAME_WIDTH,
        FRAME_HEIGHT,
    ));
    normalize::write_normalized(&frame, FRAME_WIDTH, FRAME_HEIGHT, path)
}
