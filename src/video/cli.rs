use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::jobs::DEFAULT_DURATION_SECS;

#[derive(Subcommand, Debug, Clone)]
pub enum ReelCommands {
    /// Generate a narrated, captioned reel from a prompt
    Generate(GenerateArgs),
    /// Compose a reel from existing narration audio and stills
    Compose(ComposeArgs),
    /// Print the estimated caption timing of a narration text
    Timings(TimingsArgs),
    /// Render a placeholder still without contacting the image service
    Placeholder(PlaceholderArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// What the reel should be about
    pub prompt: String,

    /// Target length in seconds (5-180)
    #[arg(short = 't', long, default_value_t = DEFAULT_DURATION_SECS)]
    pub duration: f64,

    /// Copy the finished video here instead of leaving it in the output directory
    #[arg(short = 'o', long = "out", value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ComposeArgs {
    /// Narration audio
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Still image, in presentation order (repeatable)
    #[arg(long = "image", required = true, value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,

    /// Narration text used to time the captions
    #[arg(long)]
    pub text: String,

    /// Cap the video length in seconds; defaults to the narration length
    #[arg(short = 't', long)]
    pub duration: Option<f64>,

    /// Output video path
    #[arg(short = 'o', long = "out", default_value = "reel.mp4", value_hint = ValueHint::FilePath)]
    pub out: PathBuf,

    /// Print the ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TimingsArgs {
    /// Narration text
    pub text: String,
}

#[derive(Args, Debug, Clone)]
pub struct PlaceholderArgs {
    /// Scene number; selects the colour pair
    pub scene_index: usize,

    /// Frame within the scene; shifts the gradient
    #[arg(long, default_value_t = 0)]
    pub frame: usize,

    /// Frames rendered per scene
    #[arg(long, default_value_t = 1)]
    pub frames_per_scene: usize,

    /// Output JPEG path
    #[arg(short = 'o', long = "out", value_hint = ValueHint::FilePath)]
    pub out: PathBuf,
}
