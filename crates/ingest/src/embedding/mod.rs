pub mod batcher;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use batcher::{batch_sentences, embed_batches};
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{embedder_for, Embedder, EmbeddingError};
