pub mod cli;
pub mod commands;
mod config;
mod jobs;
mod narration;
mod render;
mod script;
mod support;
mod timing;
mod visuals;

#[cfg(test)]
pub(crate) mod fakes;

pub use cli::ReelCommands;
pub use commands::handle_reel_command;
