mod base;
mod captions;
mod inputs;
mod util;


use std::path::{Path, PathBuf};

use anyhow::Result;

use self::inputs::SourceMap;
use crate::video::render::program::{
    BaseAssemblyProgram, FRAME_HEIGHT, FRAME_RATE, FRAME_WIDTH, MuxProgram,
};


#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
}

impl FfmpegCompileOutput {
    /// Shell-quoted command line, for dry runs and logs.
    pub fn command_line(&self, binary: &str) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(binary.to_string());
        words.extend(self.args.iter().cloned());
        shell_words::join(words)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    /// Separate labelled chains of a filter graph.
    pub fn join(&self) -> String {
        self.filters.join("; ")
    }

    /// Run filters one after another on a single stream.
    pub fn join_linear(&self) -> String {
        self.filters.join(",")
    }
}

/// Video dimensions (width x height in pixels).
#[derive(Debug, Clone, Copy)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for VideoDimensions {
    fn default() -> Self {
        Self::new(FRAME_WIDTH, FRAME_HEIGHT)
    }
}

/// Look of the burned-in caption words.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    /// Font file; when unset, `font_family` is resolved through fontconfig
    pub font_file: Option<PathBuf>,
    pub font_family: String,
    pub font_size: u32,
    pub color: String,
    pub border_width: u32,
    pub border_color: String,
    pub shadow_color: String,
    pub shadow_offset: u32,
    /// Distance of the text baseline from the bottom edge
    pub baseline_offset: u32,
    pub bounce_amplitude: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_file: None,
            font_family: "Sans".to_string(),
            font_size: 80,
            color: "white".to_string(),
            border_width: 5,
            border_color: "black".to_string(),
            shadow_color: "black@0.5".to_string(),
            shadow_offset: 3,
            baseline_offset: 250,
            bounce_amplitude: 20,
        }
    }
}

impl CaptionStyle {
    pub fn with_font(font_file: Option<PathBuf>) -> Self {
        Self {
            font_file,
            ..Self::default()
        }
    }
}

pub struct FfmpegCompiler {
    dimensions: VideoDimensions,
    frame_rate: u32,
    caption_style: CaptionStyle,
}

impl FfmpegCompiler {
    pub fn new(dimensions: VideoDimensions, caption_style: CaptionStyle) -> Self {
        Self {
            dimensions,
            frame_rate: FRAME_RATE,
            caption_style,
        }
    }

    /// Silent slideshow pass.
    pub fn compile_base(
        &self,
        program: &BaseAssemblyProgram,
        output: &Path,
    ) -> Result<FfmpegCompileOutput> {
        let mut args = preamble();

        let mut sources = SourceMap::new();
        for input in &program.inputs {
            sources.add(input);
        }
        args.extend(sources.input_args());

        args.push("-filter_complex".to_string());
        args.push(self.build_base_graph(program)?);
        args.push("-map".to_string());
        args.push("[outv]".to_string());

        program.profile.push_to(&mut args);
        args.push(output.to_string_lossy().into_owned());

        Ok(FfmpegCompileOutput { args })
    }

    /// Caption overlay and narration mux pass. With no captions this is a
    /// plain re-encode of the base video with the narration attached.
    pub fn compile_mux(&self, program: &MuxProgram, output: &Path) -> Result<FfmpegCompileOutput> {
        let mut args = preamble();

        let mut sources = SourceMap::new();
        let video = sources.add(&program.video);
        let audio = sources.add(&program.audio);
        args.extend(sources.input_args());

        if let Some(chain) = self.build_caption_chain(&program.captions) {
            args.push("-vf".to_string());
            args.push(chain);
        }

        args.push("-map".to_string());
        args.push(format!("{video}:v:0"));
        args.push("-map".to_string());
        args.push(format!("{audio}:a:0"));

        program.profile.push_to(&mut args);
        if program.shortest {
            args.push("-shortest".to_string());
        }
        args.push(output.to_string_lossy().into_owned());

        Ok(FfmpegCompileOutput { args })
    }
}

fn preamble() -> Vec<String> {
    vec!["-y".to_string(), "-hide_banner".to_string()]
}
