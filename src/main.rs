mod common;
mod ui;
mod video;

use clap::Parser;

use crate::ui::prelude::{Level, OutputFormat, emit};
use crate::video::{ReelCommands, handle_reel_command};

/// Turn a prompt into a narrated vertical video with animated captions
#[derive(Parser, Debug)]
#[command(name = "reelforge", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for status messages
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: ReelCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.format, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = handle_reel_command(cli.command).await {
        emit(Level::Error, "reel.error", &format!("Error: {err:#}"), None);
        std::process::exit(1);
    }
}
