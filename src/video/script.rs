//! Narration scripts and the chat-completion backend that drafts them.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ui::prelude::{Level, emit};

/// Average narration speaking rate used to size the script.
const WORDS_PER_SECOND: f64 = 2.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub narration: String,
    pub visual: String,
    /// Target duration hint from the writer. Composition divides the real
    /// narration length evenly and never reads this value.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub hook: String,
    pub full_text: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Draft a script for `prompt` sized for `duration_secs` of narration
    async fn write(&self, prompt: &str, duration_secs: f64) -> Result<Script>;
}

/// Settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatScriptSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Script writer backed by a chat-completions API (Groq by default).
///
/// Any failure (no key, transport error, unparsable reply) degrades to
/// [`fallback_script`] so a job never stops at the script stage.
pub struct ChatScriptWriter {
    client: Client,
    settings: ChatScriptSettings,
}

impl ChatScriptWriter {
    pub fn new(settings: ChatScriptSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("reelforge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .context("Failed to create HTTP client for script generation")?;
        Ok(Self { client, settings })
    }

    async fn request_script(&self, prompt: &str, duration_secs: f64) -> Result<Script> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("no script API key configured"))?;

        let body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": system_prompt(duration_secs) },
                { "role": "user", "content": format!("Create a reel about: {prompt}") },
            ],
            "temperature": 0.8,
            "max_tokens": 1000,
            "response_format": { "type": "json_object" },
        });

        let resp = self
            .client
            .post(&self.settings.endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to reach script generation API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Script API error ({}): {}", status, text);
        }

        let completion: ChatCompletion = resp
            .json()
            .await
            .context("Failed to parse script API response")?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("script API returned no choices"))?;

        parse_script(&content)
    }
}

#[async_trait]
impl ScriptWriter for ChatScriptWriter {
    async fn write(&self, prompt: &str, duration_secs: f64) -> Result<Script> {
        match self.request_script(prompt, duration_secs).await {
            Ok(script) => Ok(script),
            Err(err) => {
                emit(
                    Level::Warn,
                    "reel.script.fallback",
                    &format!("Script generation failed ({err:#}); using built-in script"),
                    None,
                );
                Ok(fallback_script(prompt, duration_secs))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn system_prompt(duration_secs: f64) -> String {
    let target_words = (duration_secs * WORDS_PER_SECOND).floor() as u32;
    format!(
        r#"You are a viral Indian social media content creator specializing in faceless reels.
Create an engaging script for a {duration}-second video reel in HINGLISH (Hindi + English mix).

Requirements:
- Approximately {target_words} words
- Powerful hook in the first 3 seconds
- Emotional and relatable content with a call to action at the end
- Break into 3-5 scenes with visual descriptions

Return JSON only:
{{
    "hook": "Opening line",
    "scenes": [
        {{"narration": "text", "visual": "description", "duration": seconds, "words": ["word1", "word2"]}}
    ],
    "full_text": "complete narration"
}}"#,
        duration = duration_secs.round() as u32,
    )
}

/// Parse the writer's reply, tolerating prose or code fences around the JSON.
pub fn parse_script(content: &str) -> Result<Script> {
    let start = content
        .find('{')
        .ok_or_else(|| anyhow!("script reply contains no JSON object"))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| anyhow!("script reply contains no JSON object"))?;
    if end < start {
        anyhow::bail!("script reply contains no JSON object");
    }

    let mut script: Script =
        serde_json::from_str(&content[start..=end]).context("Script JSON did not match schema")?;

    if script.full_text.trim().is_empty() {
        script.full_text = script
            .scenes
            .iter()
            .map(|s| s.narration.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }
    if script.full_text.trim().is_empty() {
        anyhow::bail!("script has no narration text");
    }

    Ok(script)
}

/// Deterministic two-scene script used when the writer is unavailable.
pub fn fallback_script(prompt: &str, duration_secs: f64) -> Script {
    let half = duration_secs / 2.0;
    let first = format!("Toh dekho, {prompt} actually bahut interesting hai. Ye suno carefully.");
    let second = "Yaar ye game changer hai! Must try karo aur share karo!".to_string();

    Script {
        hook: format!("Dekho yaar, {prompt} ke baare mein kuch amazing bataata hoon"),
        full_text: format!(
            "Dekho yaar, {prompt} ke baare mein kuch amazing bataata hoon. {first} {second}"
        ),
        scenes: vec![
            Scene {
                words: first.split_whitespace().map(str::to_string).collect(),
                narration: first,
                visual: format!("Dynamic colorful visuals about {prompt}"),
                duration: half,
            },
            Scene {
                words: second.split_whitespace().map(str::to_string).collect(),
                narration: second,
                visual: "Inspiring energetic conclusion scene".to_string(),
                duration: half,
            },
        ],
    }
}
