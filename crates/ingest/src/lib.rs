pub mod document;
pub mod embedding;
pub mod pipeline;
pub mod tokenizer;

pub use document::chunker::{
    Chunk, ChunkingError, FixedSizeChunker, PipelineStage, SemanticChunker,
};
pub use document::{extract_text, ExtractedDocument, ExtractionError, PageContent};
pub use embedding::{Embedder, EmbeddingError, OllamaEmbedder, OpenAiEmbedder};
pub use pipeline::{ChunkedDocument, Chunker, DocumentPipeline, PipelineError};
pub use tokenizer::{TiktokenCounter, TokenCounter, TokenizerError, WhitespaceCounter};
