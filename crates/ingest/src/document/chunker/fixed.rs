//! Sentence packing without embeddings.

use std::sync::Arc;

use tracing::info;

use semchunk_core::ChunkingConfig;

use super::assembler::assemble;
use super::types::{Chunk, ChunkingError, Cluster};
use crate::document::segmenter::SentenceSegmenter;
use crate::tokenizer::TokenCounter;

/// Packs sentences into token-bounded chunks in document order. Every
/// sentence is its own cluster, so no provider is ever called.
pub struct FixedSizeChunker {
    counter: Arc<dyn TokenCounter>,
    segmenter: Box<dyn SentenceSegmenter>,
    token_limit: usize,
}

impl FixedSizeChunker {
    pub fn new(
        counter: Arc<dyn TokenCounter>,
        segmenter: Box<dyn SentenceSegmenter>,
        config: &ChunkingConfig,
    ) -> Result<Self, ChunkingError> {
        config.validate()?;
        Ok(Self {
            counter,
            segmenter,
            token_limit: config.token_limit,
        })
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let sentences = self.segmenter.split(text);
        let clusters: Vec<Cluster> = (0..sentences.len()).map(|i| Cluster::new(vec![i])).collect();
        let chunks = assemble(&clusters, &sentences, self.counter.as_ref(), self.token_limit);
        info!(sentences = sentences.len(), chunks = chunks.len(), "fixed-size chunking complete");
        chunks
    }
}
