//! Structured render programs.
//!
//! Programs describe a transcode as data (inputs, per-input transforms,
//! concatenation, caption overlays, encoding profile). They are turned
//! into ffmpeg arguments only by the compiler, so all timing math here is
//! testable without running ffmpeg.

use std::path::PathBuf;

use super::error::CompositionError;
use crate::video::timing::WordTiming;
use crate::video::visuals::VisualAsset;

pub const FRAME_RATE: u32 = 30;
pub const FRAME_WIDTH: u32 = 1080;
pub const FRAME_HEIGHT: u32 = 1920;

/// Per-frame zoom increment applied by the Ken Burns effect.
pub const ZOOM_STEP: f64 = 0.002;
pub const ZOOM_MIN: f64 = 1.0;
pub const ZOOM_MAX: f64 = 1.3;

pub const UNIT_FADE_SECONDS: f64 = 0.5;
pub const CAPTION_FADE_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Even positions zoom in, odd positions zoom out.
    pub fn for_position(position: usize) -> Self {
        if position % 2 == 0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomPan {
    pub direction: ZoomDirection,
    /// Output frames generated from the still
    pub frames: u32,
    pub step: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub start: f64,
    pub duration: f64,
}

/// Transform applied to one input of the base assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTransform {
    /// Index into [`BaseAssemblyProgram::inputs`]
    pub input: usize,
    pub zoom: ZoomPan,
    pub fade_in: Fade,
    pub fade_out: Fade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatSpec {
    pub segments: usize,
}

/// Encoder settings shared by every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProfile {
    pub video_codec: &'static str,
    pub pixel_format: &'static str,
    pub frame_rate: u32,
    pub preset: &'static str,
    pub crf: u8,
    pub audio: Option<AudioEncoding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioEncoding {
    pub codec: &'static str,
    pub bitrate: &'static str,
}

pub const PROFILE_H264_SILENT: EncodeProfile = EncodeProfile {
    video_codec: "libx264",
    pixel_format: "yuv420p",
    frame_rate: FRAME_RATE,
    preset: "medium",
    crf: 18,
    audio: None,
};

pub const PROFILE_H264_AAC: EncodeProfile = EncodeProfile {
    video_codec: "libx264",
    pixel_format: "yuv420p",
    frame_rate: FRAME_RATE,
    preset: "medium",
    crf: 18,
    audio: Some(AudioEncoding {
        codec: "aac",
        bitrate: "192k",
    }),
};

impl EncodeProfile {
    pub fn push_to(&self, args: &mut Vec<String>) {
        args.push("-c:v".to_string());
        args.push(self.video_codec.to_string());
        args.push("-pix_fmt".to_string());
        args.push(self.pixel_format.to_string());
        args.push("-r".to_string());
        args.push(self.frame_rate.to_string());
        args.push("-preset".to_string());
        args.push(self.preset.to_string());
        args.push("-crf".to_string());
        args.push(self.crf.to_string());
        match &self.audio {
            Some(audio) => {
                args.push("-c:a".to_string());
                args.push(audio.codec.to_string());
                args.push("-b:a".to_string());
                args.push(audio.bitrate.to_string());
            }
            None => args.push("-an".to_string()),
        }
    }
}

/// Silent slideshow: every asset zoomed, faded and concatenated in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseAssemblyProgram {
    pub inputs: Vec<PathBuf>,
    pub units: Vec<UnitTransform>,
    pub concat: ConcatSpec,
    pub unit_duration: f64,
    pub profile: EncodeProfile,
}

impl BaseAssemblyProgram {
    pub fn total_duration(&self) -> f64 {
        self.unit_duration * self.units.len() as f64
    }
}

/// One caption word drawn over the base video.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionOverlay {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub fade: f64,
}

/// Base video muxed with narration, optionally with burned-in captions.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxProgram {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub captions: Vec<CaptionOverlay>,
    /// Stop at the shorter of the two streams
    pub shortest: bool,
    pub profile: EncodeProfile,
}

/// Resolve how long the reel runs: the probed narration, capped by the request.
pub fn effective_duration(probed: f64, requested: f64) -> f64 {
    probed.min(requested)
}

/// Split the effective duration evenly across all assets.
pub fn per_unit_duration(effective: f64, asset_count: usize) -> Result<f64, CompositionError> {
    if asset_count == 0 {
        return Err(CompositionError::NoVisualAssets);
    }
    if !effective.is_finite() || effective <= 0.0 {
        return Err(CompositionError::BaseAssembly(format!(
            "effective duration must be positive, got {effective}"
        )));
    }
    Ok(effective / asset_count as f64)
}

pub fn plan_base_assembly(
    assets: &[VisualAsset],
    unit_duration: f64,
) -> Result<BaseAssemblyProgram, CompositionError> {
    if assets.is_empty() {
        return Err(CompositionError::NoVisualAssets);
    }

    let frames = (unit_duration * FRAME_RATE as f64).floor() as u32;
    if frames == 0 {
        return Err(CompositionError::BaseAssembly(format!(
            "{unit_duration:.3}s per asset is shorter than one frame"
        )));
    }

    let units = (0..assets.len())
        .map(|position| UnitTransform {
            input: position,
            zoom: ZoomPan {
                direction: ZoomDirection::for_position(position),
                frames,
                step: ZOOM_STEP,
                min_scale: ZOOM_MIN,
                max_scale: ZOOM_MAX,
            },
            fade_in: Fade {
                start: 0.0,
                duration: UNIT_FADE_SECONDS,
            },
            fade_out: Fade {
                start: (unit_duration - UNIT_FADE_SECONDS).max(0.0),
                duration: UNIT_FADE_SECONDS,
            },
        })
        .collect();

    Ok(BaseAssemblyProgram {
        inputs: assets.iter().map(|a| a.path.clone()).collect(),
        units,
        concat: ConcatSpec {
            segments: assets.len(),
        },
        unit_duration,
        profile: PROFILE_H264_SILENT,
    })
}

/// One overlay per word; malformed windows reject the whole caption pass.
pub fn plan_captions(timings: &[WordTiming]) -> Result<Vec<CaptionOverlay>, CompositionError> {
    timings
        .iter()
        .map(|timing| {
            let valid = timing.start.is_finite()
                && timing.end.is_finite()
                && timing.start >= 0.0
                && timing.end > timing.start;
            if !valid {
                return Err(CompositionError::CaptionOverlay(format!(
                    "word #{} '{}' has invalid window [{}, {}]",
                    timing.index, timing.word, timing.start, timing.end
                )));
            }
            Ok(CaptionOverlay {
                text: timing.word.clone(),
                start: timing.start,
                end: timing.end,
                fade: CAPTION_FADE_SECONDS.min(timing.duration() / 2.0),
            })
        })
        .collect()
}

pub fn plan_mux(
    video: PathBuf,
    audio: PathBuf,
    captions: Vec<CaptionOverlay>,
) -> MuxProgram {
    MuxProgram {
        video,
        audio,
        captions,
        shortest: true,
        profile: PROFILE_H264_AAC,
    }
}
