use std::time::Duration;

use anyhow::Result;

use crate::video::render::ffmpeg::compiler::FfmpegCompileOutput;
use crate::video::render::ffmpeg::services::{FfmpegRunOptions, FfmpegRunner};

/// One compiled ffmpeg invocation, ready to print or run.
pub(super) struct RenderPass {
    label: &'static str,
    compiled: FfmpegCompileOutput,
    expected_duration: f64,
}

impl RenderPass {
    pub(super) fn new(
        label: &'static str,
        compiled: FfmpegCompileOutput,
        expected_duration: f64,
    ) -> Self {
        Self {
            label,
            compiled,
            expected_duration,
        }
    }

    pub(super) fn command_line(&self) -> String {
        self.compiled.command_line("ffmpeg")
    }

    pub(super) async fn execute(
        &self,
        runner: &dyn FfmpegRunner,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let options = FfmpegRunOptions::new(self.label, Some(self.expected_duration), timeout);
        runner.run(&self.compiled.args, options).await
    }
}
