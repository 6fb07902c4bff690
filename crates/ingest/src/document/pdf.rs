use super::{ExtractionError, PageContent};

pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;

    let pages = split_pages(&text);
    if pages.is_empty() {
        // Scanned/image PDFs come back empty; downstream treats that as no content.
        tracing::warn!("PDF contained no extractable text");
    }
    Ok(pages)
}

/// pdf-extract returns all text as one string; pages are separated by form
/// feeds when the PDF has them. Blank pages are dropped, numbering is kept.
fn split_pages(text: &str) -> Vec<PageContent> {
    if !text.contains('\x0C') {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![PageContent {
            page_number: 1,
            text: trimmed.to_string(),
        }];
    }

    text.split('\x0C')
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| PageContent {
            page_number: i + 1,
            text: page_text.trim().to_string(),
        })
        .collect()
}
