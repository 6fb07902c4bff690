//! Chunk output, cluster and error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use semchunk_core::ConfigError;

use crate::embedding::EmbeddingError;
use crate::tokenizer::TokenizerError;

// ── Errors ──────────────────────────────────────────────────────────────────

/// Why a chunking run aborted. No partial chunk list is ever returned.
#[derive(Debug, Error)]
pub enum ChunkingError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("embedding provider failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("tokenizer failed: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("embedding shape mismatch: {0}")]
    EmbeddingShape(String),

    #[error("chunking cancelled after the {0} stage")]
    Cancelled(PipelineStage),
}

// ── Pipeline stages ─────────────────────────────────────────────────────────

/// States a document passes through, in order. None is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PipelineStage {
    Extracted,
    Normalized,
    Segmented,
    Batched,
    Embedded,
    Clustered,
    Assembled,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        Self::Extracted,
        Self::Normalized,
        Self::Segmented,
        Self::Batched,
        Self::Embedded,
        Self::Clustered,
        Self::Assembled,
    ];
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracted => "extracted",
            Self::Normalized => "normalized",
            Self::Segmented => "segmented",
            Self::Batched => "batched",
            Self::Embedded => "embedded",
            Self::Clustered => "clustered",
            Self::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

// ── Clusters ────────────────────────────────────────────────────────────────

/// Sentence indices grouped together. Indices are sorted ascending once the
/// cluster builder returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub indices: Vec<usize>,
}

impl Cluster {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Smallest sentence index, i.e. the cluster's position in the document.
    pub fn first(&self) -> Option<usize> {
        self.indices.iter().copied().min()
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A chunk of text ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// 0-based index within the document.
    pub index: usize,
    /// Sentences (or word fragments) joined by single spaces.
    pub content: String,
    /// Token count as summed during packing.
    pub token_count: usize,
    /// Document-order index of the first contributing sentence.
    pub first_sentence: usize,
}
