use std::collections::HashMap;

use super::ParsedContent;
use crate::error::ScrapeError;

/// Extracts text from a PDF byte blob via a text-extraction crate rather than
/// shelling out to an external tool. The only parser in the chain that can
/// fail: a corrupt or unparseable PDF yields a `ParseError`.
pub fn parse(bytes: &[u8], media_type: &str) -> Result<ParsedContent, ScrapeError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ScrapeError::ParseError(format!("pdf extraction failed: {e}")))?;

    let mut extra_metadata = HashMap::new();
    if let Ok(page_count) = count_pages(bytes) {
        extra_metadata.insert("page_count".to_string(), page_count.to_string());
    }

    Ok(ParsedContent {
        text,
        original_media_type: media_type.to_string(),
        extra_metadata,
    })
}

/// Rough page count by scanning for `/Type /Page` object markers; best-effort
/// only, never fails the parse if it can't find any.
fn count_pages(bytes: &[u8]) -> Result<usize, ()> {
    let haystack = String::from_utf8_lossy(bytes);
    let count = haystack.matches("/Type/Page").count() + haystack.matches("/Type /Page").count();
    if count == 0 {
        Err(())
    } else {
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_pdf_yields_parse_error() {
        let result = parse(b"not a real pdf", "application/pdf");
        assert!(result.is_err());
        match result {
            Err(ScrapeError::ParseError(_)) => {}
            _ => panic!("expected ParseError"),
        }
    }
}
