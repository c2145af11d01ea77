//! Narration synthesis through an external text-to-speech service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::ui::prelude::{Level, emit};
use crate::video::render::ffmpeg::services::MediaProber;

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";
/// The endpoint rejects requests longer than this many characters.
const MAX_CHUNK_CHARS: usize = 100;
/// Slightly slower than normal speech for clarity.
const TTS_SPEED: &str = "0.9";

/// One synthesized narration file plus its probed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration: f64,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("narration synthesis failed: {0}")]
    SynthesisFailure(String),
}

impl SynthesisError {
    fn failure(err: impl std::fmt::Display) -> Self {
        SynthesisError::SynthesisFailure(err.to_string())
    }
}

#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    /// Speak `text` in `language_hint` and write the audio to `output`
    async fn synthesize(
        &self,
        text: &str,
        language_hint: &str,
        output: &Path,
    ) -> Result<AudioTrack, SynthesisError>;
}

/// Map a script language hint to a TTS language code.
pub fn tts_language(hint: &str) -> String {
    match hint.trim().to_lowercase().as_str() {
        "hinglish" | "hindi" => "hi".to_string(),
        "" | "english" => "en".to_string(),
        other => other.to_string(),
    }
}

/// Split text into request-sized chunks on word boundaries.
///
/// Words longer than `max_chars` are cut into `max_chars` pieces.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current.chars().count() + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Synthesizer using the public Google Translate speech endpoint.
pub struct TranslateTts {
    client: Client,
    prober: Arc<dyn MediaProber>,
}

impl TranslateTts {
    pub fn new(timeout: Duration, prober: Arc<dyn MediaProber>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) reelforge")
            .timeout(timeout)
            .build()?;
        Ok(Self { client, prober })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<bytes::Bytes, SynthesisError> {
        let idx_str = idx.to_string();
        let total_str = total.to_string();
        let len_str = chunk.chars().count().to_string();
        let resp = self
            .client
            .get(TRANSLATE_TTS_URL)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", language),
                ("total", total_str.as_str()),
                ("idx", idx_str.as_str()),
                ("textlen", len_str.as_str()),
                ("client", "tw-ob"),
                ("ttsspeed", TTS_SPEED),
            ])
            .send()
            .await
            .map_err(SynthesisError::failure)?;

        if !resp.status().is_success() {
            return Err(SynthesisError::SynthesisFailure(format!(
                "voice service returned {} for chunk {}/{}",
                resp.status(),
                idx + 1,
                total
            )));
        }

        resp.bytes().await.map_err(SynthesisError::failure)
    }
}

#[async_trait]
impl NarrationSynthesizer for TranslateTts {
    async fn synthesize(
        &self,
        text: &str,
        language_hint: &str,
        output: &Path,
    ) -> Result<AudioTrack, SynthesisError> {
        let chunks = split_for_tts(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SynthesisError::SynthesisFailure(
                "narration text is empty".to_string(),
            ));
        }

        let language = tts_language(language_hint);
        emit(
            Level::Debug,
            "reel.narration.request",
            &format!(
                "Requesting {} speech chunk(s) in '{}'",
                chunks.len(),
                language
            ),
            None,
        );

        let mut file = tokio::fs::File::create(output)
            .await
            .map_err(SynthesisError::failure)?;
        let total = chunks.len();
        for (idx, chunk) in chunks.iter().enumerate() {
            let audio = self.fetch_chunk(chunk, &language, idx, total).await?;
            file.write_all(&audio)
                .await
                .map_err(SynthesisError::failure)?;
        }
        file.flush().await.map_err(SynthesisError::failure)?;

        let duration = self
            .prober
            .duration(output)
            .await
            .map_err(|err| SynthesisError::SynthesisFailure(format!("{err:#}")))?;

        Ok(AudioTrack {
            path: output.to_path_buf(),
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hinglish_maps_to_hindi_voice() {
        assert_eq!(tts_language("hinglish"), "hi");
        assert_eq!(tts_language("Hinglish "), "hi");
        assert_eq!(tts_language(""), "en");
        assert_eq!(tts_language("ta"), "ta");
    }

    #[test]
    fn chunks_respect_limit_and_word_boundaries() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = split_for_tts(text, 16);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
        assert_eq!(chunks.join(" "), text);
        assert_eq!(chunks[0], "alpha beta gamma");
    }

    #[test]
    fn overlong_word_is_cut() {
        let chunks = split_for_tts("tiny abcdefghij", 4);
        assert_eq!(chunks, vec!["tiny", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_for_tts("  ", 100).is_empty());
    }
}
