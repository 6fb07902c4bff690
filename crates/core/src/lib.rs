pub mod config;
pub mod error;

pub use config::{ChunkStrategy, ChunkingConfig, Config};
pub use error::*;
