//! Composition engine: turns narration, stills and caption timings into
//! one finished vertical video.
//!
//! Composition runs in two ffmpeg passes. The base pass zooms, fades and
//! concatenates every still into a silent video whose length is the
//! narration length (capped by the requested duration). The caption pass
//! burns one animated word at a time over that video and muxes in the
//! narration. If anything about the caption pass fails, the base video is
//! muxed with the narration without captions instead.

mod error;
pub mod ffmpeg;
mod logging;
mod output;
mod pipeline;
pub mod program;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::json;

use crate::ui::prelude::Level;
use crate::video::support::ffmpeg::missing_tools;
use crate::video::support::utils::remove_files_best_effort;
use crate::video::timing::WordTiming;
use crate::video::visuals::VisualAsset;

pub use self::error::CompositionError;
use self::ffmpeg::compiler::{CaptionStyle, FfmpegCompiler, VideoDimensions};
use self::ffmpeg::services::{FfmpegRunner, FfprobeProber, MediaProber, SystemFfmpegRunner};
use self::logging::{log_event, log_event_with};
use self::output::prepare_output_destination;
use self::pipeline::RenderPass;
use self::program::{
    BaseAssemblyProgram, MuxProgram, effective_duration, per_unit_duration, plan_base_assembly,
    plan_captions, plan_mux,
};

/// Files a single composition writes.
#[derive(Debug, Clone)]
pub struct CompositionTargets {
    /// Intermediate silent video
    pub base: PathBuf,
    pub output: PathBuf,
}

/// Inputs to one composition.
#[derive(Debug, Clone, Copy)]
pub struct CompositionInputs<'a> {
    pub audio: &'a Path,
    /// Duration already measured by the narrator; probed when `None`
    pub audio_duration: Option<f64>,
    pub assets: &'a [VisualAsset],
    pub timings: &'a [WordTiming],
    pub requested_duration: f64,
}

pub struct Compositor {
    runner: Arc<dyn FfmpegRunner>,
    prober: Arc<dyn MediaProber>,
    compiler: FfmpegCompiler,
    pass_timeout: Option<Duration>,
}

impl Compositor {
    pub fn new(
        runner: Arc<dyn FfmpegRunner>,
        prober: Arc<dyn MediaProber>,
        caption_style: CaptionStyle,
        pass_timeout: Option<Duration>,
    ) -> Self {
        Self {
            runner,
            prober,
            compiler: FfmpegCompiler::new(VideoDimensions::default(), caption_style),
            pass_timeout,
        }
    }

    /// Compositor backed by the `ffmpeg` and `ffprobe` binaries on PATH.
    pub fn system(caption_font: Option<PathBuf>, pass_timeout: Option<Duration>) -> Result<Self> {
        let missing = missing_tools();
        if !missing.is_empty() {
            bail!(
                "Required tools not found in PATH: {}. Install ffmpeg to compose videos.",
                missing.join(", ")
            );
        }

        Ok(Self::new(
            Arc::new(SystemFfmpegRunner::locate()?),
            Arc::new(FfprobeProber::new(pass_timeout)),
            CaptionStyle::with_font(caption_font),
            pass_timeout,
        ))
    }

    pub async fn compose(
        &self,
        inputs: CompositionInputs<'_>,
        targets: &CompositionTargets,
    ) -> Result<PathBuf, CompositionError> {
        let base = self.plan_base(&inputs).await?;

        prepare_output_destination(&targets.base, &[inputs.audio])
            .and_then(|()| prepare_output_destination(&targets.output, &[inputs.audio]))
            .map_err(|err| CompositionError::BaseAssembly(format!("{err:#}")))?;

        log_event(
            Level::Info,
            "reel.compose.base",
            format!(
                "Assembling {} stills at {:.2}s each",
                base.units.len(),
                base.unit_duration
            ),
        );
        let base_pass = self
            .compiler
            .compile_base(&base, &targets.base)
            .map(|compiled| RenderPass::new("base", compiled, base.total_duration()))
            .map_err(|err| CompositionError::BaseAssembly(format!("{err:#}")))?;
        base_pass
            .execute(self.runner.as_ref(), self.pass_timeout)
            .await
            .map_err(|err| CompositionError::BaseAssembly(format!("{err:#}")))?;

        let total = base.total_duration();
        if let Err(err) = self.try_primary(&inputs, targets, total).await {
            log_event(
                Level::Warn,
                "reel.compose.captions_failed",
                format!("{err}; rendering without captions"),
            );
            self.try_fallback(&inputs, targets, total).await?;
        }

        let mut intermediates = vec![inputs.audio.to_path_buf(), targets.base.clone()];
        intermediates.extend(inputs.assets.iter().map(|asset| asset.path.clone()));
        remove_files_best_effort(&intermediates).await;

        log_event_with(
            Level::Success,
            "reel.compose.done",
            format!("Video written to {}", targets.output.display()),
            json!({ "output": targets.output, "duration": total }),
        );
        Ok(targets.output.clone())
    }

    /// Command lines for every pass, without running them.
    pub async fn dry_run(
        &self,
        inputs: CompositionInputs<'_>,
        targets: &CompositionTargets,
    ) -> Result<Vec<String>, CompositionError> {
        let base = self.plan_base(&inputs).await?;
        let base_pass = self
            .compiler
            .compile_base(&base, &targets.base)
            .map(|compiled| RenderPass::new("base", compiled, base.total_duration()))
            .map_err(|err| CompositionError::BaseAssembly(format!("{err:#}")))?;

        let mux = self.mux_program(&inputs, targets)?;
        let mux_pass = self
            .compiler
            .compile_mux(&mux, &targets.output)
            .map(|compiled| RenderPass::new("captions", compiled, base.total_duration()))
            .map_err(|err| CompositionError::CaptionOverlay(format!("{err:#}")))?;

        Ok(vec![base_pass.command_line(), mux_pass.command_line()])
    }

    async fn plan_base(
        &self,
        inputs: &CompositionInputs<'_>,
    ) -> Result<BaseAssemblyProgram, CompositionError> {
        if inputs.assets.is_empty() {
            return Err(CompositionError::NoVisualAssets);
        }

        let probed = match inputs.audio_duration {
            Some(known) if known.is_finite() && known > 0.0 => known,
            _ => self
                .prober
                .duration(inputs.audio)
                .await
                .map_err(|err| CompositionError::Probe(format!("{err:#}")))?,
        };
        let effective = effective_duration(probed, inputs.requested_duration);
        log_event(
            Level::Debug,
            "reel.compose.duration",
            format!(
                "Narration {:.2}s, requested {:.2}s, rendering {:.2}s",
                probed, inputs.requested_duration, effective
            ),
        );

        let per_unit = per_unit_duration(effective, inputs.assets.len())?;
        plan_base_assembly(inputs.assets, per_unit)
    }

    fn mux_program(
        &self,
        inputs: &CompositionInputs<'_>,
        targets: &CompositionTargets,
    ) -> Result<MuxProgram, CompositionError> {
        let captions = plan_captions(inputs.timings)?;
        Ok(plan_mux(
            targets.base.clone(),
            inputs.audio.to_path_buf(),
            captions,
        ))
    }

    async fn try_primary(
        &self,
        inputs: &CompositionInputs<'_>,
        targets: &CompositionTargets,
        total: f64,
    ) -> Result<(), CompositionError> {
        let program = self.mux_program(inputs, targets)?;
        log_event(
            Level::Info,
            "reel.compose.captions",
            format!("Overlaying {} caption words", program.captions.len()),
        );
        self.run_mux("captions", &program, targets, total)
            .await
            .map_err(|err| CompositionError::CaptionOverlay(format!("{err:#}")))
    }

    async fn try_fallback(
        &self,
        inputs: &CompositionInputs<'_>,
        targets: &CompositionTargets,
        total: f64,
    ) -> Result<(), CompositionError> {
        let program = plan_mux(targets.base.clone(), inputs.audio.to_path_buf(), Vec::new());
        self.run_mux("mux", &program, targets, total)
            .await
            .map_err(|err| CompositionError::Mux(format!("{err:#}")))
    }

    async fn run_mux(
        &self,
        label: &'static str,
        program: &MuxProgram,
        targets: &CompositionTargets,
        total: f64,
    ) -> Result<()> {
        let compiled = self.compiler.compile_mux(program, &targets.output)?;
        RenderPass::new(label, compiled, total)
            .execute(self.runner.as_ref(), self.pass_timeout)
            .await
    }
}
