use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use super::{ImageError, ImageGenerator};
use crate::ui::prelude::{Level, emit};

const BASE_URL: &str = "https://image.pollinations.ai/prompt";

/// Query variants tried in order: model-pinned first, then the service default.
const VARIANTS: [Option<&str>; 2] = [Some("flux"), None];

/// Image generator backed by the Pollinations prompt endpoint.
pub struct PollinationsGenerator {
    client: Client,
}

impl PollinationsGenerator {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(format!("reelforge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, ImageError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ImageError::Request(err.to_string()))?;

        if !resp.status().is_success() {
            return Err(ImageError::Status(resp.status().as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|err| ImageError::Request(err.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(bytes)
    }
}

pub fn variant_url(
    prompt: &str,
    width: u32,
    height: u32,
    seed: u64,
    model: Option<&str>,
) -> String {
    let model = model.map(|m| format!("&model={m}")).unwrap_or_default();
    format!(
        "{BASE_URL}/{}?width={width}&height={height}{model}&nologo=true&enhance=true&seed={seed}",
        urlencoding::encode(prompt)
    )
}

#[async_trait]
impl ImageGenerator for PollinationsGenerator {
    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        seed: u64,
    ) -> Result<Bytes, ImageError> {
        let mut last_error = ImageError::Empty;

        for (attempt, model) in VARIANTS.iter().enumerate() {
            let url = variant_url(prompt, width, height, seed, *model);
            match self.fetch(&url).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    emit(
                        Level::Debug,
                        "reel.visuals.attempt_failed",
                        &format!("Image variant {} failed: {err}", attempt + 1),
                        None,
                    );
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_variant_carries_model() {
        let url = variant_url("a cat, 3D", 1080, 1920, 201, Some("flux"));
        assert_eq!(
            url,
            "https://image.pollinations.ai/prompt/a%20cat%2C%203D?width=1080&height=1920&model=flux&nologo=true&enhance=true&seed=201"
        );
    }

    #[test]
    fn default_variant_omits_model() {
        let url = variant_url("dog", 10, 20, 0, None);
        assert!(!url.contains("model="));
        assert!(url.ends_with("height=20&nologo=true&enhance=true&seed=0"));
    }
}
