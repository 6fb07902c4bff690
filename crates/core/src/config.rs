use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
    pub normalization: NormalizationConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &[
    "OPENAI_API_KEY",
    "EMBEDDING_PROVIDER",
    "OLLAMA_URL",
    "CHUNK_TOKEN_LIMIT",
];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SEMCHUNK_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SEMCHUNK_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            chunking: ChunkingConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            openai: OpenAiConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            normalization: NormalizationConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  chunking:      strategy={}, token_limit={}, batch_token_limit={}, threshold={}, min_cluster={}",
            self.chunking.strategy,
            self.chunking.token_limit,
            self.chunking.batch_token_limit,
            self.chunking.similarity_threshold,
            self.chunking.min_cluster_size
        );
        tracing::info!(
            "  embedding:     provider={}, model={}, dims={}, tokenizer={}",
            self.embedding.provider,
            self.embedding.model,
            self.embedding.dimensions,
            self.embedding.tokenizer
        );
        tracing::info!("  openai:        base_url={}, key_set={}", self.openai.base_url, self.openai.is_configured());
        tracing::info!("  ollama:        url={}", self.ollama.url);
        tracing::info!(
            "  normalization: mode={}, segmenter={}",
            self.normalization.mode,
            self.normalization.segmenter
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "chunking": {
                "strategy": self.chunking.strategy.to_string(),
                "token_limit": self.chunking.token_limit,
                "batch_token_limit": self.chunking.batch_token_limit,
                "similarity_threshold": self.chunking.similarity_threshold,
                "min_cluster_size": self.chunking.min_cluster_size,
                "embedding_concurrency": self.chunking.embedding_concurrency,
            },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "tokenizer": self.embedding.tokenizer,
            },
            "openai": {
                "base_url": self.openai.base_url,
                "chat_model": self.openai.chat_model,
                "configured": self.openai.is_configured(),
            },
            "ollama": { "url": self.ollama.url, "embedding_model": self.ollama.embedding_model },
            "normalization": {
                "mode": self.normalization.mode,
                "min_chars": self.normalization.min_chars,
                "whitespace_ratio_threshold": self.normalization.whitespace_ratio_threshold,
                "segmenter": self.normalization.segmenter,
            },
        })
    }
}

// ── Chunking ──────────────────────────────────────────────────

/// Which chunking algorithm a pipeline run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Embedding-based clustering before packing.
    Semantic,
    /// Plain sentence packing, no provider calls.
    Fixed,
}

impl FromStr for ChunkStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::UnknownValue {
                key: "CHUNK_STRATEGY",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => f.write_str("semantic"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// Parameters consumed by the chunking engine. The engine has no defaults of
/// its own; every value comes from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub strategy: ChunkStrategy,
    /// Per-chunk token ceiling.
    pub token_limit: usize,
    /// Per-embedding-call token ceiling, must be >= `token_limit`.
    pub batch_token_limit: usize,
    /// Seed similarity for phase-1 clustering, in (0, 1).
    pub similarity_threshold: f32,
    pub min_cluster_size: usize,
    /// Embedding batches in flight at once.
    pub embedding_concurrency: usize,
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            strategy: profiled_env_parse(p, "CHUNK_STRATEGY", ChunkStrategy::Semantic),
            token_limit: profiled_env_parse(p, "CHUNK_TOKEN_LIMIT", 200),
            batch_token_limit: profiled_env_parse(p, "EMBEDDING_BATCH_TOKEN_LIMIT", 8000),
            similarity_threshold: profiled_env_parse(p, "SIMILARITY_THRESHOLD", 0.9),
            min_cluster_size: profiled_env_parse(p, "MIN_CLUSTER_SIZE", 3),
            embedding_concurrency: profiled_env_parse(p, "EMBEDDING_CONCURRENCY", 4),
        }
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_limit == 0 {
            return Err(ConfigError::ZeroTokenLimit);
        }
        if self.batch_token_limit < self.token_limit {
            return Err(ConfigError::BatchLimitBelowChunkLimit {
                batch: self.batch_token_limit,
                chunk: self.token_limit,
            });
        }
        // NaN fails both comparisons, so it is rejected too.
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold < 1.0) {
            return Err(ConfigError::SimilarityThreshold(self.similarity_threshold));
        }
        if self.min_cluster_size == 0 {
            return Err(ConfigError::ZeroMinClusterSize);
        }
        if self.embedding_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai", "ollama"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    /// Token counter name: a tiktoken model/encoding name, or "whitespace".
    pub tokenizer: String,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        let model = profiled_env_or(p, "EMBEDDING_MODEL", "text-embedding-3-large");
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "openai"),
            dimensions: profiled_env_parse(p, "EMBEDDING_DIMENSIONS", 3072),
            tokenizer: profiled_env_or(p, "TOKENIZER", &model),
            model,
        }
    }
}

// ── OpenAI ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Chat model used for LLM text normalization.
    pub chat_model: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            base_url: profiled_env_or(p, "OPENAI_BASE_URL", "https://api.openai.com"),
            chat_model: profiled_env_or(p, "OPENAI_CHAT_MODEL", "gpt-4o-mini"),
            timeout_secs: profiled_env_parse(p, "OPENAI_TIMEOUT_SECS", 120),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            embedding_model: profiled_env_or(p, "OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

// ── Normalization ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// "whitespace", "llm", "none"
    pub mode: String,
    /// Pages shorter than this are passed through untouched by the LLM normalizer.
    pub min_chars: usize,
    /// Non-whitespace / whitespace ratio above which text is only whitespace-collapsed.
    pub whitespace_ratio_threshold: f64,
    /// Sentence segmenter: "unicode" (UAX #29) or "punctuation".
    pub segmenter: String,
}

impl NormalizationConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            mode: profiled_env_or(p, "NORMALIZATION_MODE", "whitespace"),
            min_chars: profiled_env_parse(p, "NORMALIZATION_MIN_CHARS", 50),
            whitespace_ratio_threshold: profiled_env_parse(p, "WHITESPACE_RATIO_THRESHOLD", 3.0),
            segmenter: profiled_env_or(p, "SENTENCE_SEGMENTER", "unicode"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunking() -> ChunkingConfig {
        ChunkingConfig {
            strategy: ChunkStrategy::Semantic,
            token_limit: 200,
            batch_token_limit: 8000,
            similarity_threshold: 0.9,
            min_cluster_size: 3,
            embedding_concurrency: 4,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(chunking().validate().is_ok());
    }

    #[test]
    fn batch_limit_below_chunk_limit_rejected() {
        let cfg = ChunkingConfig {
            batch_token_limit: 100,
            ..chunking()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BatchLimitBelowChunkLimit { batch: 100, chunk: 200 })
        );
    }

    #[test]
    fn threshold_bounds_are_exclusive() {
        for bad in [0.0, 1.0, -0.5, 1.5, f32::NAN] {
            let cfg = ChunkingConfig {
                similarity_threshold: bad,
                ..chunking()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::SimilarityThreshold(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn zero_values_rejected() {
        let cfg = ChunkingConfig {
            min_cluster_size: 0,
            ..chunking()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMinClusterSize));

        let cfg = ChunkingConfig {
            token_limit: 0,
            ..chunking()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTokenLimit));

        let cfg = ChunkingConfig {
            embedding_concurrency: 0,
            ..chunking()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("semantic".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Semantic);
        assert_eq!(" FIXED ".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Fixed);
        assert!("late".parse::<ChunkStrategy>().is_err());
        assert_eq!(ChunkStrategy::Fixed.to_string(), "fixed");
    }

    #[test]
    fn profiled_key_takes_precedence() {
        env::set_var("SEMCHUNK_TEST_PROFILE_KEY", "plain");
        env::set_var("QA_SEMCHUNK_TEST_PROFILE_KEY", "profiled");
        assert_eq!(
            profiled_env_opt("QA", "SEMCHUNK_TEST_PROFILE_KEY").as_deref(),
            Some("profiled")
        );
        assert_eq!(
            profiled_env_opt("", "SEMCHUNK_TEST_PROFILE_KEY").as_deref(),
            Some("plain")
        );
        assert_eq!(
            profiled_env_opt("OTHER", "SEMCHUNK_TEST_PROFILE_KEY").as_deref(),
            Some("plain")
        );
    }

    #[test]
    fn redacted_summary_hides_api_key() {
        let mut config = Config::for_profile("SEMCHUNK_REDACTION_TEST");
        config.openai.api_key = Some("sk-secret".to_string());
        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("sk-secret"));
        assert!(summary.contains("\"configured\":true"));
    }
}
