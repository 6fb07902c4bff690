//! Packs ordered clusters into token-bounded chunks.

use super::types::{Chunk, Cluster};
use crate::tokenizer::TokenCounter;

/// Open chunk being filled.
#[derive(Default)]
struct Pending {
    parts: Vec<String>,
    tokens: usize,
    first_sentence: Option<usize>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn push(&mut self, text: String, tokens: usize, sentence: usize) {
        self.first_sentence.get_or_insert(sentence);
        self.parts.push(text);
        self.tokens += tokens;
    }

    fn fits(&self, tokens: usize, limit: usize) -> bool {
        self.tokens + tokens <= limit
    }

    /// Emit the open chunk (if any) and reset.
    fn flush_into(&mut self, out: &mut Vec<Chunk>) {
        let pending = std::mem::take(self);
        let Some(first_sentence) = pending.first_sentence else {
            return;
        };
        out.push(Chunk {
            index: out.len(),
            content: pending.parts.join(" "),
            token_count: pending.tokens,
            first_sentence,
        });
    }
}

/// Walk clusters in order and pack them into chunks of at most `token_limit`
/// tokens.
///
/// A cluster that does not fit alongside the open chunk starts a new one. A
/// cluster over the limit on its own is split into sentence-level chunks, and
/// any sentence still over the limit into word-level chunks. A single word
/// over the limit is emitted alone and is the only way a chunk can exceed
/// `token_limit`.
///
/// Chunks come out ordered by their first sentence. A split cluster that
/// skips sentences can emit sub-chunks ahead of a later cluster's chunk, so
/// the output is stably re-sorted and re-indexed after the walk.
pub fn assemble(
    clusters: &[Cluster],
    sentences: &[String],
    counter: &dyn TokenCounter,
    token_limit: usize,
) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut current = Pending::default();

    for cluster in clusters {
        let Some(first) = cluster.first() else {
            continue;
        };
        let text = cluster_text(cluster, sentences);
        if text.is_empty() {
            continue;
        }
        let tokens = counter.count(&text);

        if current.fits(tokens, token_limit) {
            current.push(text, tokens, first);
        } else if tokens > token_limit {
            current.flush_into(&mut out);
            split_cluster(cluster, sentences, counter, token_limit, &mut out);
        } else {
            current.flush_into(&mut out);
            current.push(text, tokens, first);
        }
    }

    current.flush_into(&mut out);
    restore_document_order(&mut out);
    out
}

fn restore_document_order(chunks: &mut [Chunk]) {
    chunks.sort_by_key(|c| c.first_sentence);
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.index = i;
    }
}

fn cluster_text(cluster: &Cluster, sentences: &[String]) -> String {
    cluster
        .indices
        .iter()
        .filter_map(|&i| sentences.get(i))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_cluster(
    cluster: &Cluster,
    sentences: &[String],
    counter: &dyn TokenCounter,
    token_limit: usize,
    out: &mut Vec<Chunk>,
) {
    let mut sub = Pending::default();

    for &i in &cluster.indices {
        let Some(sentence) = sentences.get(i) else {
            continue;
        };
        let tokens = counter.count(sentence);

        if tokens > token_limit {
            sub.flush_into(out);
            split_sentence(sentence, i, counter, token_limit, out);
            continue;
        }
        if !sub.fits(tokens, token_limit) {
            sub.flush_into(out);
        }
        sub.push(sentence.clone(), tokens, i);
    }

    sub.flush_into(out);
}

fn split_sentence(
    sentence: &str,
    index: usize,
    counter: &dyn TokenCounter,
    token_limit: usize,
    out: &mut Vec<Chunk>,
) {
    let mut sub = Pending::default();

    for word in sentence.split_whitespace() {
        // Trailing space so the count covers the separator too.
        let tokens = counter.count(&format!("{word} "));
        if !sub.is_empty() && !sub.fits(tokens, token_limit) {
            sub.flush_into(out);
        }
        sub.push(word.to_string(), tokens, index);
    }

    sub.flush_into(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WhitespaceCounter;

    fn words(prefix: &str, n: usize) -> String {
        (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(" ")
    }

    fn singletons(n: usize) -> Vec<Cluster> {
        (0..n).map(|i| Cluster::new(vec![i])).collect()
    }

    #[test]
    fn small_clusters_share_a_chunk() {
        let sentences = vec![words("a", 3), words("b", 3), words("c", 3)];
        let chunks = assemble(&singletons(3), &sentences, &WhitespaceCounter, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, sentences.join(" "));
        assert_eq!(chunks[0].token_count, 9);
        assert_eq!(chunks[0].first_sentence, 0);
    }

    #[test]
    fn overflow_starts_new_chunk() {
        let sentences = vec![words("a", 6), words("b", 6), words("c", 3)];
        let chunks = assemble(&singletons(3), &sentences, &WhitespaceCounter, 10);
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec![sentences[0].clone(), format!("{} {}", sentences[1], sentences[2])]);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].first_sentence, 1);
    }

    #[test]
    fn exact_limit_fits() {
        let sentences = vec![words("a", 5), words("b", 5)];
        let chunks = assemble(&singletons(2), &sentences, &WhitespaceCounter, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].token_count, 10);
    }

    #[test]
    fn oversized_cluster_flushes_open_chunk_first() {
        let sentences = vec![words("a", 2), words("b", 6), words("c", 6), words("d", 2)];
        let clusters = vec![Cluster::new(vec![0]), Cluster::new(vec![1, 2]), Cluster::new(vec![3])];
        let chunks = assemble(&clusters, &sentences, &WhitespaceCounter, 10);
        let firsts: Vec<usize> = chunks.iter().map(|c| c.first_sentence).collect();
        assert_eq!(firsts, vec![0, 1, 2, 3]);
        assert_eq!(chunks[0].content, sentences[0]);
        assert_eq!(chunks[1].content, sentences[1]);
        assert_eq!(chunks[2].content, sentences[2]);
    }

    #[test]
    fn split_gapped_cluster_keeps_document_order() {
        // {0,2} is over the limit and splits; {1} must land between its halves.
        let sentences = vec![words("a", 6), words("b", 3), words("c", 5)];
        let clusters = vec![Cluster::new(vec![0, 2]), Cluster::new(vec![1])];
        let chunks = assemble(&clusters, &sentences, &WhitespaceCounter, 6);

        let firsts: Vec<usize> = chunks.iter().map(|c| c.first_sentence).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec![sentences[0].as_str(), sentences[1].as_str(), sentences[2].as_str()]);
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(chunks.iter().all(|c| c.token_count <= 6));
    }

    #[test]
    fn word_chunks_of_one_sentence_stay_in_order() {
        let sentences = vec![words("a", 2), words("w", 14), words("b", 2)];
        let clusters = vec![Cluster::new(vec![0, 1]), Cluster::new(vec![2])];
        let chunks = assemble(&clusters, &sentences, &WhitespaceCounter, 5);
        let rebuilt: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt.join(" "), sentences.join(" "));
        for pair in chunks.windows(2) {
            assert!(pair[0].first_sentence <= pair[1].first_sentence);
        }
    }

    #[test]
    fn oversized_sentence_degrades_to_words() {
        let sentences = vec![words("w", 25)];
        let chunks = assemble(&singletons(1), &sentences, &WhitespaceCounter, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.token_count <= 10));
        assert!(chunks.iter().all(|c| c.first_sentence == 0));
        let rebuilt: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt.join(" "), sentences[0]);
    }

    #[test]
    fn word_over_limit_is_emitted_alone() {
        struct CharCounter;
        impl TokenCounter for CharCounter {
            fn count(&self, text: &str) -> usize {
                text.trim().chars().count()
            }
            fn name(&self) -> &str {
                "chars"
            }
        }

        let sentences = vec!["ab cd abcdefghijkl ef".to_string()];
        let chunks = assemble(&singletons(1), &sentences, &CharCounter, 5);
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["ab cd", "abcdefghijkl", "ef"]);
        assert_eq!(chunks[1].token_count, 12);
    }

    #[test]
    fn indices_are_sequential() {
        let sentences: Vec<String> = (0..8).map(|i| words(&format!("s{i}_"), 4)).collect();
        let chunks = assemble(&singletons(8), &sentences, &WhitespaceCounter, 9);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(!chunk.content.trim().is_empty());
        }
    }

    #[test]
    fn no_clusters_no_chunks() {
        assert!(assemble(&[], &[], &WhitespaceCounter, 10).is_empty());
    }
}
