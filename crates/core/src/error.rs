use thiserror::Error;

/// Invalid chunking configuration. Raised before any provider call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("token_limit must be at least 1")]
    ZeroTokenLimit,

    #[error("batch_token_limit ({batch}) must be >= token_limit ({chunk})")]
    BatchLimitBelowChunkLimit { batch: usize, chunk: usize },

    #[error("similarity_threshold must be in (0, 1), got {0}")]
    SimilarityThreshold(f32),

    #[error("min_cluster_size must be at least 1")]
    ZeroMinClusterSize,

    #[error("embedding_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("unknown {key}: {value}")]
    UnknownValue { key: &'static str, value: String },
}
