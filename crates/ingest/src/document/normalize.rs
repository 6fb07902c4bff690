//! Page text cleanup ahead of sentence segmentation.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use semchunk_core::config::{NormalizationConfig, OpenAiConfig};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("unknown normalization mode: {0}")]
    UnknownMode(String),
}

/// Turns raw page text into the de-noised form the chunker expects.
#[async_trait]
pub trait TextNormalizer: Send + Sync {
    async fn normalize(&self, text: &str) -> Result<String, NormalizeError>;
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Non-whitespace characters per whitespace character. Infinite when the
/// text has no whitespace at all.
pub fn whitespace_ratio(text: &str) -> f64 {
    let (ws, non_ws) = text.chars().fold((0usize, 0usize), |(ws, non_ws), c| {
        if c.is_whitespace() {
            (ws + 1, non_ws)
        } else {
            (ws, non_ws + 1)
        }
    });
    non_ws as f64 / ws as f64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNormalizer;

#[async_trait]
impl TextNormalizer for WhitespaceNormalizer {
    async fn normalize(&self, text: &str) -> Result<String, NormalizeError> {
        Ok(collapse_whitespace(text))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughNormalizer;

#[async_trait]
impl TextNormalizer for PassthroughNormalizer {
    async fn normalize(&self, text: &str) -> Result<String, NormalizeError> {
        Ok(text.trim().to_string())
    }
}

const CLEANUP_PROMPT: &str = "As a professional text cleaner, your job is to normalize the following \
text to improve readability. Retain the original meaning and semantics. Adjust formatting issues such \
as excessive spaces, misplaced line breaks, or unintended special characters to make the text \
syntactically clear and human-readable. Use the same language as the text. Never translate the text \
to another language. Return only the cleaned text without any additional text or comments.";

/// Rewrites badly formatted pages with an OpenAI-compatible chat model.
///
/// Short pages are returned as-is and pages with ordinary whitespace density
/// are only collapsed locally; the model is asked only when whitespace is
/// suspiciously dense (typical of broken PDF layouts).
pub struct LlmNormalizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    min_chars: usize,
    ratio_threshold: f64,
}

impl LlmNormalizer {
    pub fn new(openai: &OpenAiConfig, api_key: String, settings: &NormalizationConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(openai.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            model: openai.chat_model.clone(),
            base_url: openai.base_url.clone(),
            min_chars: settings.min_chars,
            ratio_threshold: settings.whitespace_ratio_threshold,
        }
    }

    fn needs_rewrite(&self, text: &str) -> bool {
        whitespace_ratio(text) <= self.ratio_threshold
    }

    async fn rewrite(&self, text: &str) -> Result<String, NormalizeError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": CLEANUP_PROMPT },
                { "role": "user", "content": text },
            ],
        });

        debug!("normalization request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(NormalizeError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| NormalizeError::Parse("missing choices[0].message.content".into()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextNormalizer for LlmNormalizer {
    async fn normalize(&self, text: &str) -> Result<String, NormalizeError> {
        if text.chars().count() < self.min_chars {
            return Ok(text.trim().to_string());
        }
        if !self.needs_rewrite(text) {
            return Ok(collapse_whitespace(text));
        }
        match self.rewrite(text).await {
            Ok(cleaned) => Ok(cleaned),
            Err(e) => {
                warn!(error = %e, "LLM normalization failed, collapsing whitespace instead");
                Ok(collapse_whitespace(text))
            }
        }
    }
}

/// Build the normalizer selected by `settings.mode`. The LLM mode needs an
/// OpenAI key; without one it degrades to whitespace collapsing.
pub fn normalizer_for(
    settings: &NormalizationConfig,
    openai: &OpenAiConfig,
) -> Result<Box<dyn TextNormalizer>, NormalizeError> {
    match settings.mode.to_lowercase().as_str() {
        "whitespace" => Ok(Box::new(WhitespaceNormalizer)),
        "none" => Ok(Box::new(PassthroughNormalizer)),
        "llm" => match &openai.api_key {
            Some(key) => Ok(Box::new(LlmNormalizer::new(openai, key.clone(), settings))),
            None => {
                warn!("NORMALIZATION_MODE=llm but OPENAI_API_KEY is not set, using whitespace");
                Ok(Box::new(WhitespaceNormalizer))
            }
        },
        other => Err(NormalizeError::UnknownMode(other.to_string())),
    }
}
