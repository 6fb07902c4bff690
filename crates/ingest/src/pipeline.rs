//! End-to-end document flow: extract, normalize, chunk.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{info, warn};

use semchunk_core::{ChunkStrategy, Config};

use crate::document::chunker::{Chunk, ChunkingError, FixedSizeChunker, PipelineStage, SemanticChunker};
use crate::document::normalize::{normalizer_for, NormalizeError, TextNormalizer};
use crate::document::segmenter::segmenter_for;
use crate::document::{extract_text, ExtractedDocument, ExtractionError};
use crate::embedding::embedder_for;
use crate::tokenizer::{counter_for, TokenCounter};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
}

/// The chunking strategy a pipeline runs after normalization.
pub enum Chunker {
    Semantic(SemanticChunker),
    Fixed(FixedSizeChunker),
}

/// Chunks produced for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkedDocument {
    pub filename: String,
    pub file_type: String,
    pub page_count: usize,
    pub chunks: Vec<Chunk>,
}

pub struct DocumentPipeline {
    normalizer: Box<dyn TextNormalizer>,
    chunker: Chunker,
    /// Pages normalized at once.
    concurrency: usize,
}

impl DocumentPipeline {
    pub fn new(normalizer: Box<dyn TextNormalizer>, chunker: Chunker, concurrency: usize) -> Self {
        Self {
            normalizer,
            chunker,
            concurrency: concurrency.max(1),
        }
    }

    /// Wire up the normalizer, token counter and (for the semantic strategy)
    /// embedder named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let chunking = &config.chunking;
        chunking.validate().map_err(ChunkingError::from)?;

        let normalizer = normalizer_for(&config.normalization, &config.openai)?;
        let counter: Arc<dyn TokenCounter> = Arc::from(
            counter_for(&config.embedding.tokenizer).map_err(ChunkingError::from)?,
        );
        let segmenter = segmenter_for(&config.normalization.segmenter).map_err(ChunkingError::from)?;

        let chunker = match chunking.strategy {
            ChunkStrategy::Semantic => {
                let embedder = embedder_for(&config.embedding, &config.openai, &config.ollama)
                    .map_err(ChunkingError::from)?;
                Chunker::Semantic(SemanticChunker::new(embedder, counter, segmenter, chunking.clone())?)
            }
            ChunkStrategy::Fixed => Chunker::Fixed(FixedSizeChunker::new(counter, segmenter, chunking)?),
        };

        Ok(Self::new(normalizer, chunker, chunking.embedding_concurrency))
    }

    pub async fn run(&self, bytes: &[u8], filename: &str) -> Result<ChunkedDocument, PipelineError> {
        self.run_inner(bytes, filename, None).await
    }

    /// Like [`run`](Self::run), but stops as soon as `shutdown` is notified.
    pub async fn run_with_shutdown(
        &self,
        bytes: &[u8],
        filename: &str,
        shutdown: Arc<Notify>,
    ) -> Result<ChunkedDocument, PipelineError> {
        self.run_inner(bytes, filename, Some(shutdown)).await
    }

    async fn run_inner(
        &self,
        bytes: &[u8],
        filename: &str,
        shutdown: Option<Arc<Notify>>,
    ) -> Result<ChunkedDocument, PipelineError> {
        let doc = extract_text(bytes, filename)?;
        let total_chars = doc.total_chars();
        info!(
            filename,
            file_type = %doc.file_type,
            pages = doc.pages.len(),
            chars = total_chars,
            stage = %PipelineStage::Extracted,
            "document extracted"
        );
        if total_chars == 0 {
            warn!(filename, "document contains no extractable text");
        }

        let pages = match &shutdown {
            Some(notify) => tokio::select! {
                biased;
                _ = notify.notified() => {
                    return Err(ChunkingError::Cancelled(PipelineStage::Extracted).into());
                }
                pages = self.normalize_pages(&doc) => pages?,
            },
            None => self.normalize_pages(&doc).await?,
        };
        let body = ExtractedDocument::body(&pages);
        info!(chars = body.chars().count(), stage = %PipelineStage::Normalized, "document normalized");

        let chunks = match (&self.chunker, shutdown) {
            (Chunker::Semantic(c), Some(notify)) => c.chunk_with_shutdown(&body, notify).await?,
            (Chunker::Semantic(c), None) => c.chunk(&body).await?,
            (Chunker::Fixed(c), _) => c.chunk(&body),
        };

        Ok(ChunkedDocument {
            filename: doc.filename,
            file_type: doc.file_type,
            page_count: doc.pages.len(),
            chunks,
        })
    }

    /// Normalize every page, at most `concurrency` at a time, keeping page
    /// order. Pages that normalize to nothing are dropped.
    async fn normalize_pages(&self, doc: &ExtractedDocument) -> Result<Vec<String>, NormalizeError> {
        let pages: Vec<String> = stream::iter(doc.pages.iter())
            .map(|page| self.normalizer.normalize(&page.text))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(pages.into_iter().filter(|p| !p.is_empty()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::normalize::WhitespaceNormalizer;
    use crate::document::segmenter::UnicodeSentenceSegmenter;
    use crate::tokenizer::WhitespaceCounter;
    use semchunk_core::ChunkingConfig;

    fn fixed_pipeline(token_limit: usize) -> DocumentPipeline {
        let config = ChunkingConfig {
            strategy: ChunkStrategy::Fixed,
            token_limit,
            batch_token_limit: 1000,
            similarity_threshold: 0.9,
            min_cluster_size: 3,
            embedding_concurrency: 2,
        };
        let chunker = FixedSizeChunker::new(
            Arc::new(WhitespaceCounter),
            Box::new(UnicodeSentenceSegmenter),
            &config,
        )
        .unwrap();
        DocumentPipeline::new(Box::new(WhitespaceNormalizer), Chunker::Fixed(chunker), 2)
    }

    #[tokio::test]
    async fn text_file_is_chunked() {
        let text = b"First   sentence here.\n\nSecond sentence follows. Third one ends it.";
        let doc = fixed_pipeline(5).run(text, "notes.txt").await.unwrap();
        assert_eq!(doc.filename, "notes.txt");
        assert_eq!(doc.file_type, "txt");
        assert_eq!(doc.page_count, 1);
        let contents: Vec<&str> = doc.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["First sentence here.", "Second sentence follows.", "Third one ends it."]
        );
    }

    #[tokio::test]
    async fn empty_file_yields_no_chunks() {
        let doc = fixed_pipeline(50).run(b"   ", "empty.md").await.unwrap();
        assert!(doc.chunks.is_empty());
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let err = fixed_pipeline(50).run(b"data", "sheet.xlsx").await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::UnsupportedType(_))));
    }

    #[tokio::test]
    async fn pending_shutdown_stops_before_normalization() {
        let shutdown = Arc::new(Notify::new());
        shutdown.notify_one();
        let err = fixed_pipeline(50)
            .run_with_shutdown(b"Some text.", "a.txt", shutdown)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Chunking(ChunkingError::Cancelled(PipelineStage::Extracted))
        ));
    }

    #[test]
    fn semantic_strategy_needs_provider_credentials() {
        let mut config = Config::for_profile("");
        config.chunking.strategy = ChunkStrategy::Semantic;
        config.embedding.provider = "openai".into();
        config.embedding.tokenizer = "whitespace".into();
        config.normalization.mode = "whitespace".into();
        config.openai.api_key = None;
        assert!(matches!(
            DocumentPipeline::from_config(&config),
            Err(PipelineError::Chunking(ChunkingError::Embedding(_)))
        ));
    }

    #[tokio::test]
    async fn configured_segmenter_drives_chunking() {
        let mut config = Config::for_profile("");
        config.chunking.strategy = ChunkStrategy::Fixed;
        config.chunking.token_limit = 5;
        config.chunking.batch_token_limit = 1000;
        config.embedding.tokenizer = "whitespace".into();
        config.normalization.mode = "whitespace".into();
        config.normalization.segmenter = "punctuation".into();
        let pipeline = DocumentPipeline::from_config(&config).unwrap();
        let doc = pipeline.run(b"Stop! said the guard. Then he left.", "v.txt").await.unwrap();
        let contents: Vec<&str> = doc.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Stop! said the guard.", "Then he left."]);
        // Two sentences, not three: the second chunk starts at sentence 1.
        assert_eq!(doc.chunks[1].first_sentence, 1);
    }

    #[test]
    fn unknown_segmenter_is_rejected() {
        let mut config = Config::for_profile("");
        config.chunking.strategy = ChunkStrategy::Fixed;
        config.embedding.tokenizer = "whitespace".into();
        config.normalization.mode = "none".into();
        config.normalization.segmenter = "regex".into();
        assert!(matches!(
            DocumentPipeline::from_config(&config),
            Err(PipelineError::Chunking(ChunkingError::Config(_)))
        ));
    }

    #[test]
    fn fixed_strategy_needs_no_provider() {
        let mut config = Config::for_profile("");
        config.chunking.strategy = ChunkStrategy::Fixed;
        config.embedding.tokenizer = "whitespace".into();
        config.normalization.mode = "none".into();
        assert!(DocumentPipeline::from_config(&config).is_ok());
    }
}
