//! Token counting for a named embedding model's vocabulary.

use thiserror::Error;
use tiktoken_rs::CoreBPE;

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to load encoding for {name}: {reason}")]
    Load { name: String, reason: String },
}

/// Counts tokens the way an embedding model would. Implementations must be
/// deterministic: the same text always yields the same count within a run.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Model or encoding name, for logs.
    fn name(&self) -> &str;
}

/// BPE counter backed by tiktoken encoding tables.
pub struct TiktokenCounter {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load the encoding used by `model`. Accepts OpenAI model names and raw
    /// encoding names (`cl100k_base`, `o200k_base`).
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        let loaded = match model {
            "cl100k_base"
            | "text-embedding-3-large"
            | "text-embedding-3-small"
            | "text-embedding-ada-002" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            other => tiktoken_rs::get_bpe_from_model(other),
        };
        let bpe = loaded.map_err(|e| TokenizerError::Load {
            name: model.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: model.to_string(),
            bpe,
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Approximate token count via whitespace splitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Build the counter named in configuration: `"whitespace"` or a tiktoken
/// model/encoding name.
pub fn counter_for(name: &str) -> Result<Box<dyn TokenCounter>, TokenizerError> {
    if name.eq_ignore_ascii_case("whitespace") {
        return Ok(Box::new(WhitespaceCounter));
    }
    Ok(Box::new(TiktokenCounter::for_model(name)?))
}
