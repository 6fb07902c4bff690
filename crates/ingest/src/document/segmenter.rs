//! Sentence segmentation of normalized document text.

use unicode_segmentation::UnicodeSegmentation;

use semchunk_core::ConfigError;

use super::normalize::collapse_whitespace;

/// Splits a text body into an ordered sequence of sentences.
///
/// Every returned sentence is trimmed, whitespace-collapsed and non-empty, so
/// empty or whitespace-only input yields an empty sequence.
pub trait SentenceSegmenter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// UAX #29 sentence boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSegmenter;

impl SentenceSegmenter for UnicodeSentenceSegmenter {
    fn split(&self, text: &str) -> Vec<String> {
        text.split_sentence_bounds()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Splits at `. `, `! `, `? ` followed by an uppercase letter or the end of
/// the text. Cheaper than UAX #29 and predictable for ASCII prose.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSegmenter;

impl SentenceSegmenter for PunctuationSegmenter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let bytes = text.as_bytes();

        let mut i = 0;
        while i < bytes.len() {
            let is_terminal = matches!(bytes[i], b'.' | b'!' | b'?');
            if is_terminal && i + 1 < bytes.len() && bytes[i + 1] == b' ' {
                // End of text after the space counts as a boundary too.
                let boundary = match bytes.get(i + 2) {
                    Some(next) => next.is_ascii_uppercase(),
                    None => true,
                };
                if boundary {
                    let end = i + 1;
                    push_sentence(&mut sentences, &text[start..end]);
                    start = end + 1;
                    i = start;
                    continue;
                }
            }
            i += 1;
        }

        push_sentence(&mut sentences, &text[start..]);
        sentences
    }
}

/// Build the segmenter named by `SENTENCE_SEGMENTER`.
pub fn segmenter_for(name: &str) -> Result<Box<dyn SentenceSegmenter>, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "unicode" | "uax29" => Ok(Box::new(UnicodeSentenceSegmenter)),
        "punctuation" => Ok(Box::new(PunctuationSegmenter)),
        other => Err(ConfigError::UnknownValue {
            key: "SENTENCE_SEGMENTER",
            value: other.to_string(),
        }),
    }
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let s = collapse_whitespace(raw);
    if !s.is_empty() {
        out.push(s);
    }
}
