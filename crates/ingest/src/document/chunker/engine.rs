//! Semantic chunking orchestration: segment, batch, embed, cluster, assemble.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use semchunk_core::ChunkingConfig;

use super::assembler::assemble;
use super::clusters::build_clusters;
use super::similarity::SimilarityMatrix;
use super::types::{Chunk, ChunkingError, Cluster, PipelineStage};
use crate::document::segmenter::SentenceSegmenter;
use crate::embedding::{batch_sentences, embed_batches, Embedder};
use crate::tokenizer::TokenCounter;

/// Last stage a run completed; read when a run is cancelled.
struct StageTracker(AtomicU8);

impl StageTracker {
    fn new(stage: PipelineStage) -> Self {
        Self(AtomicU8::new(stage as u8))
    }

    fn set(&self, stage: PipelineStage) {
        self.0.store(stage as u8, Ordering::Release);
    }

    fn get(&self) -> PipelineStage {
        PipelineStage::ALL[self.0.load(Ordering::Acquire) as usize]
    }
}

/// Splits a normalized text body into chunks of semantically related
/// sentences.
///
/// The embedder and token counter are shared handles so one chunker (or
/// several) can serve many documents concurrently.
pub struct SemanticChunker {
    embedder: Arc<dyn Embedder>,
    counter: Arc<dyn TokenCounter>,
    segmenter: Box<dyn SentenceSegmenter>,
    config: ChunkingConfig,
}

impl SemanticChunker {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        counter: Arc<dyn TokenCounter>,
        segmenter: Box<dyn SentenceSegmenter>,
        config: ChunkingConfig,
    ) -> Result<Self, ChunkingError> {
        config.validate()?;
        Ok(Self {
            embedder,
            counter,
            segmenter,
            config,
        })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk `text`. Empty or whitespace-only text yields no chunks and makes
    /// no provider calls.
    pub async fn chunk(&self, text: &str) -> Result<Vec<Chunk>, ChunkingError> {
        let tracker = StageTracker::new(PipelineStage::Normalized);
        self.run(text, &tracker).await
    }

    /// Like [`chunk`](Self::chunk), but abandons the run as soon as
    /// `shutdown` is notified. In-flight embedding requests are dropped and no
    /// partial result is returned.
    pub async fn chunk_with_shutdown(
        &self,
        text: &str,
        shutdown: Arc<Notify>,
    ) -> Result<Vec<Chunk>, ChunkingError> {
        let tracker = StageTracker::new(PipelineStage::Normalized);
        tokio::select! {
            biased;
            _ = shutdown.notified() => {
                let stage = tracker.get();
                warn!(%stage, "chunking cancelled");
                Err(ChunkingError::Cancelled(stage))
            }
            result = self.run(text, &tracker) => result,
        }
    }

    async fn run(&self, text: &str, tracker: &StageTracker) -> Result<Vec<Chunk>, ChunkingError> {
        let config = &self.config;
        config.validate()?;

        let sentences = self.segmenter.split(text);
        tracker.set(PipelineStage::Segmented);
        info!(sentences = sentences.len(), "text segmented");

        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let clusters = if sentences.len() == 1 {
            vec![Cluster::new(vec![0])]
        } else {
            let batches = batch_sentences(&sentences, self.counter.as_ref(), config.batch_token_limit);
            tracker.set(PipelineStage::Batched);
            debug!(batches = batches.len(), "sentences batched");

            let embeddings =
                embed_batches(self.embedder.as_ref(), &batches, config.embedding_concurrency).await?;
            check_shape(&embeddings, sentences.len())?;
            tracker.set(PipelineStage::Embedded);
            debug!(embeddings = embeddings.len(), "sentences embedded");

            let matrix = SimilarityMatrix::from_embeddings(&embeddings);
            build_clusters(&matrix, config.similarity_threshold, config.min_cluster_size)
        };
        tracker.set(PipelineStage::Clustered);
        info!(clusters = clusters.len(), "sentences clustered");

        let chunks = assemble(&clusters, &sentences, self.counter.as_ref(), config.token_limit);
        tracker.set(PipelineStage::Assembled);
        info!(chunks = chunks.len(), "chunks assembled");
        Ok(chunks)
    }
}

/// One vector per sentence, all of the same width.
fn check_shape(embeddings: &[Vec<f32>], sentences: usize) -> Result<(), ChunkingError> {
    if embeddings.len() != sentences {
        return Err(ChunkingError::EmbeddingShape(format!(
            "{} embeddings for {} sentences",
            embeddings.len(),
            sentences
        )));
    }
    if let Some(first) = embeddings.first() {
        let width = first.len();
        if let Some(bad) = embeddings.iter().position(|e| e.len() != width) {
            return Err(ChunkingError::EmbeddingShape(format!(
                "embedding {} has {} dimensions, expected {}",
                bad,
                embeddings[bad].len(),
                width
            )));
        }
    }
    Ok(())
}
