//! Token-bounded batching of sentences and fan-out of batches to an embedder.

use futures::stream::{self, StreamExt};
use tracing::debug;

use super::traits::{Embedder, EmbeddingError};
use crate::tokenizer::TokenCounter;

/// Group sentences into batches whose summed token count stays within
/// `token_limit`, preserving order.
///
/// A sentence that is over the limit on its own gets a batch to itself; the
/// batcher never splits text. Empty input yields no batches.
pub fn batch_sentences(
    sentences: &[String],
    counter: &dyn TokenCounter,
    token_limit: usize,
) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in sentences {
        let tokens = counter.count(sentence);

        if tokens > token_limit {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            batches.push(vec![sentence.clone()]);
            continue;
        }

        if current_tokens + tokens > token_limit && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        current.push(sentence.clone());
        current_tokens += tokens;
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Embed every batch with at most `concurrency` requests in flight.
///
/// Results land in a slot per batch index, so the returned vectors follow
/// sentence order regardless of completion order. The first failing batch
/// aborts the whole call; in-flight requests are dropped.
pub async fn embed_batches(
    embedder: &dyn Embedder,
    batches: &[Vec<String>],
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut slots: Vec<Option<Vec<Vec<f32>>>> = vec![None; batches.len()];

    let mut in_flight = stream::iter(batches.iter().enumerate())
        .map(|(i, batch)| async move {
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            Ok((i, vectors))
        })
        .buffer_unordered(concurrency.max(1));

    while let Some(result) = in_flight.next().await {
        let (i, vectors) = result?;
        debug!(batch = i, vectors = vectors.len(), "embedding batch complete");
        slots[i] = Some(vectors);
    }

    Ok(slots.into_iter().flatten().flatten().collect())
}
