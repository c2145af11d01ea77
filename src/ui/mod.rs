use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

static RENDERER: LazyLock<RwLock<Renderer>> = LazyLock::new(|| RwLock::new(Renderer::default()));

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
}

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

/// Remove CSI escape sequences so JSON events never carry terminal colors.
fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn current_renderer() -> Renderer {
    RENDERER
        .read()
        .map(|r| r.clone())
        .unwrap_or_default()
}

pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }

    let r = current_renderer();
    let line = match r.format {
        OutputFormat::Text => colorize(level, message, r.color),
        OutputFormat::Json => {
            let clean_msg = strip_ansi(message);
            let ev = Event {
                level: level.as_str(),
                code,
                message: &clean_msg,
                timestamp: chrono::Utc::now().to_rfc3339(),
                data,
            };
            match serde_json::to_string(&ev) {
                Ok(s) => s,
                Err(_) => clean_msg,
            }
        }
    };

    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    let _ = writeln!(out, "{}", line);
}

pub fn get_output_format() -> OutputFormat {
    current_renderer().format
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, get_output_format};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_removes_color_sequences() {
        let colored = "\u{1b}[1;32mdone\u{1b}[0m rendering";
        assert_eq!(strip_ansi(colored), "done rendering");
    }

    #[test]
    fn strip_ansi_keeps_plain_text() {
        assert_eq!(strip_ansi("plain [text]"), "plain [text]");
    }

    #[test]
    fn colorize_is_identity_without_color() {
        assert_eq!(colorize(Level::Error, "boom", false), "boom");
    }
}
