pub mod chunker;
pub mod normalize;
mod pdf;
pub mod segmenter;
mod txt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Separator placed between page texts when forming the document body.
pub const PAGE_SEPARATOR: &str = "\n";

/// A page of extracted text.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based page number (for PDFs). For text files, always 1.
    pub page_number: usize,
    /// The extracted text content.
    pub text: String,
}

/// Result of extracting text from a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename.
    pub filename: String,
    /// File type: "pdf", "txt", "md"
    pub file_type: String,
    /// Extracted pages in reading order.
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// Join the given (normalized) page texts into one logical body.
    pub fn body<S: AsRef<str>>(pages: &[S]) -> String {
        pages
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Extract text from file bytes based on file type.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    let file_type = ext.as_str();

    let pages = match file_type {
        "pdf" => pdf::extract_pdf(bytes)?,
        "txt" | "text" | "md" | "markdown" => txt::extract_txt(bytes)?,
        other => return Err(ExtractionError::UnsupportedType(other.to_string())),
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        file_type: file_type.to_string(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_text_types() {
        let doc = extract_text(b"Hello there.", "notes.MD").unwrap();
        assert_eq!(doc.file_type, "md");
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].text, "Hello there.");
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = extract_text(b"x", "image.png").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedType(t) if t == "png"));
    }

    #[test]
    fn body_joins_pages_with_separator() {
        assert_eq!(ExtractedDocument::body(&["a", "b", "c"]), "a\nb\nc");
        assert_eq!(ExtractedDocument::body::<&str>(&[]), "");
    }

    #[test]
    fn total_chars_spans_pages() {
        let doc = ExtractedDocument {
            filename: "x.pdf".into(),
            file_type: "pdf".into(),
            pages: vec![
                PageContent { page_number: 1, text: "one".into() },
                PageContent { page_number: 2, text: "two".into() },
            ],
        };
        assert_eq!(doc.total_chars(), 6);
    }
}
