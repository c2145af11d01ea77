use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub fn run_reel_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let home = env.home();
    let output = Command::new(env!("CARGO_BIN_EXE_reelforge"))
        .args(args)
        .current_dir(env.path())
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("GROQ_API_KEY")
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
