//! Semantic chunking engine.
//!
//! Sentences are embedded in token-bounded batches, grouped by cosine
//! similarity and packed into chunks that respect a per-chunk token limit.
//! Chunks always come out in document order.

mod assembler;
mod clusters;
mod engine;
mod fixed;
mod similarity;
mod types;

pub use assembler::assemble;
pub use clusters::build_clusters;
pub use engine::SemanticChunker;
pub use fixed::FixedSizeChunker;
pub use similarity::SimilarityMatrix;
pub use types::{Chunk, ChunkingError, Cluster, PipelineStage};
